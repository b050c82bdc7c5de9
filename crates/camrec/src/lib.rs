//! Camera recorder link.
//!
//! A request/response client for the external camera-recording service,
//! built on the same blocking JSON-line transport as the controller link:
//! `start_recording` asks the service to begin capturing, `end_recording`
//! stops it and names the FTP target the finished clip is uploaded to.
//! Each call blocks for a single `{"Status":...}` response. Socket errors
//! while waiting trigger the fixed-backoff reconnect loop; unlike the
//! controller link, the recorder never pauses the simulation.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

use network_shared::backoff::BackoffGate;
use network_shared::error::{FormatError, TransportError};
use network_shared::line::{self, LineAccumulator};

/// Connection and upload-target parameters, owned by the host
/// application's configuration layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CamRecorderConfig {
    pub camera_manager_ip: String,
    pub camera_manager_port: u16,
    /// Socket receive timeout, milliseconds.
    pub receive_timeout_ms: u64,
    /// Fixed wait between reconnect attempts, milliseconds.
    pub reconnect_delay_ms: u64,
    /// FTP host the recorder uploads finished clips to.
    pub ftp_host: String,
    /// Directory on the FTP host.
    pub ftp_dir: String,
    pub ftp_user: String,
    pub ftp_password: String,
}

impl Default for CamRecorderConfig {
    fn default() -> Self {
        Self {
            camera_manager_ip: "127.0.0.1".into(),
            camera_manager_port: 5600,
            receive_timeout_ms: 4_000,
            reconnect_delay_ms: 2_000,
            ftp_host: "127.0.0.1".into(),
            ftp_dir: "recordings".into(),
            ftp_user: String::new(),
            ftp_password: String::new(),
        }
    }
}

impl CamRecorderConfig {
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("recorder rejected the request: {message}")]
    Rejected { message: String },
    #[error("response missing `Status` member")]
    BadFrame,
}

pub struct CamRecorder {
    config: CamRecorderConfig,
    stream: Mutex<Option<TcpStream>>,
    run: AtomicBool,
    gate: BackoffGate,
}

impl CamRecorder {
    pub fn new(config: CamRecorderConfig) -> Self {
        Self {
            config,
            stream: Mutex::new(None),
            run: AtomicBool::new(true),
            gate: BackoffGate::new(),
        }
    }

    /// Open the socket to the configured camera manager.
    pub fn connect(&self) -> Result<(), TransportError> {
        let host = self.config.camera_manager_ip.as_str();
        let port = self.config.camera_manager_port;
        match TcpStream::connect((host, port)) {
            Ok(stream) => {
                stream.set_read_timeout(Some(self.config.receive_timeout()))?;
                info!(target: "camrec", host, port, "connection established");
                *self.stream.lock().unwrap_or_else(|e| e.into_inner()) = Some(stream);
                Ok(())
            }
            Err(e) => {
                warn!(target: "camrec", host, port, "connection error: {e}");
                Err(TransportError::Connect(e))
            }
        }
    }

    /// Abort any in-progress reconnect loop and close the socket.
    pub fn shutdown(&self) {
        self.run.store(false, Ordering::Release);
        self.gate.cancel();
        self.close_socket();
    }

    /// Ask the service to start capturing. Blocks for the response.
    pub fn start_recording(&self) -> Result<(), RecorderError> {
        self.send_json(&json!({ "CMD": "start" }))?;
        self.expect_status("start")
    }

    /// Stop capturing and name the upload target for the finished clip.
    /// Spaces in the identifier are flattened to underscores so the name
    /// survives the FTP path.
    pub fn end_recording(&self, training_identifier: &str) -> Result<(), RecorderError> {
        let identifier = training_identifier.replace(' ', "_");
        let ftp_url = format!(
            "ftp://{}/{}/{}.avi",
            self.config.ftp_host, self.config.ftp_dir, identifier
        );
        self.send_json(&json!({
            "CMD": "stop",
            "ftp_url": ftp_url,
            "ftp_user": self.config.ftp_user,
            "ftp_password": self.config.ftp_password,
        }))?;
        self.expect_status("stop")
    }

    fn send_json(&self, value: &Value) -> Result<(), RecorderError> {
        let frame = line::encode_line(value)?;
        let guard = self.stream.lock().unwrap_or_else(|e| e.into_inner());
        let Some(stream) = guard.as_ref() else {
            return Err(TransportError::NotConnected.into());
        };
        let mut stream = stream;
        stream.write_all(&frame).map_err(TransportError::Io)?;
        Ok(())
    }

    fn expect_status(&self, what: &str) -> Result<(), RecorderError> {
        let response = self.receive_response()?;
        let Some(status) = response.get("Status").and_then(Value::as_bool) else {
            warn!(target: "camrec", "bad frame in `{what}` response");
            return Err(RecorderError::BadFrame);
        };
        let message = response
            .get("Message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        if !message.is_empty() {
            info!(target: "camrec", "{message}");
        }
        if status {
            Ok(())
        } else {
            warn!(target: "camrec", "failed to {what} recording");
            Err(RecorderError::Rejected { message })
        }
    }

    /// Block for one complete JSON line. A socket error drops into the
    /// reconnect loop and the wait continues on the fresh connection.
    fn receive_response(&self) -> Result<Value, RecorderError> {
        let mut acc = LineAccumulator::new();
        let mut reader = self.reader().ok_or(TransportError::NotConnected)?;
        loop {
            let mut byte = [0u8; 1];
            match reader.read(&mut byte) {
                Ok(0) => {
                    warn!(target: "camrec", "socket closed by camera manager");
                    reader = self.reconnect()?;
                    acc.clear();
                }
                Ok(_) => match acc.push(byte[0]) {
                    Ok(Some(line)) => {
                        debug!(target: "camrec", "data received");
                        let value: Value =
                            serde_json::from_slice(&line).map_err(FormatError::from)?;
                        return Ok(value);
                    }
                    Ok(None) => {}
                    Err(e) => return Err(e.into()),
                },
                Err(e) => {
                    warn!(target: "camrec", "socket error: {}", TransportError::from_read(e));
                    reader = self.reconnect()?;
                    acc.clear();
                }
            }
        }
    }

    /// Fixed-backoff reconnect, aborted only by [`CamRecorder::shutdown`].
    fn reconnect(&self) -> Result<TcpStream, TransportError> {
        loop {
            if !self.run.load(Ordering::Acquire) {
                return Err(TransportError::Closed);
            }
            info!(target: "camrec", "trying to reconnect");
            if !self.gate.wait(self.config.reconnect_delay()) {
                return Err(TransportError::Closed);
            }
            self.close_socket();
            if self.connect().is_ok() {
                if let Some(reader) = self.reader() {
                    return Ok(reader);
                }
            }
        }
    }

    fn reader(&self) -> Option<TcpStream> {
        self.stream
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .and_then(|s| s.try_clone().ok())
    }

    fn close_socket(&self) {
        if let Some(stream) = self.stream.lock().unwrap_or_else(|e| e.into_inner()).take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

impl Drop for CamRecorder {
    fn drop(&mut self) {
        self.shutdown();
    }
}
