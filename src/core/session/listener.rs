use crate::core::error::*;
use crate::core::protocol::*;

use log::*;
use std::io::BufReader;
use std::net::{Ipv4Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex, PoisonError};

/// Handle on the client stream currently being read, so another thread can
/// shut it down and unblock the reader.
#[derive(Debug, Default, Clone)]
pub struct ActiveStream {
    stream: Arc<Mutex<Option<TcpStream>>>,
}

impl ActiveStream {
    pub fn new() -> Self {
        ActiveStream::default()
    }

    fn set(&self, stream: Option<TcpStream>) {
        let mut active = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        *active = stream;
    }

    pub fn is_active(&self) -> bool {
        let active = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        active.is_some()
    }

    /// Returns true if a stream was shut down.
    pub fn shutdown(&self) -> bool {
        let active = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(stream) = active.as_ref() {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                debug!("shutdown: {}", e);
            }
            return true;
        }
        return false;
    }
}

pub struct Listener {
    listener: TcpListener,
    active: ActiveStream,
}

impl Listener {
    /// Listens on every IPv4 interface. Port 0 picks a free port.
    pub fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .map_err(|e| AtonError::connect(port, e))?;
        Ok(Listener {
            listener,
            active: ActiveStream::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn active_stream(&self) -> ActiveStream {
        self.active.clone()
    }

    /// Blocks until a client connects.
    pub fn accept(&self) -> Result<Connection> {
        let (stream, peer) = self.listener.accept()?;
        match stream.try_clone() {
            Ok(s) => self.active.set(Some(s)),
            Err(e) => warn!("Connection from {} cannot be interrupted: {}", peer, e),
        }
        Ok(Connection {
            reader: BufReader::new(stream),
            peer,
            finished: false,
            active: self.active.clone(),
        })
    }
}

/// Packets from one client, up to and including `CloseImage` or `Terminate`.
///
/// Ends at end of stream, and after yielding the first error.
pub struct Connection {
    reader: BufReader<TcpStream>,
    peer: SocketAddr,
    finished: bool,
    active: ActiveStream,
}

impl Connection {
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Iterator for Connection {
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match read_packet(&mut self.reader) {
            Ok(Some(packet)) => {
                if packet.ends_stream() {
                    self.finished = true;
                }
                Some(Ok(packet))
            }
            Ok(None) => {
                trace!("{} closed the stream", self.peer);
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.active.set(None);
    }
}
