use super::encode::*;
use super::packet::*;
use crate::core::error::*;

use log::*;
use std::io::{self, BufWriter, ErrorKind, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

/// Sending side of the protocol: what a renderer's display driver does.
pub struct Client {
    addr: SocketAddr,
    stream: Option<BufWriter<TcpStream>>,
}

impl Client {
    /// Resolves a `host:port` string and connects.
    pub fn new(hostname: &str) -> Result<Self> {
        let split: Vec<_> = hostname.rsplitn(2, ':').collect();
        if split.len() != 2 {
            let msg = format!(
                "Expected \"host:port\" for receiver address. Given \"{}\".",
                hostname
            );
            return Err(AtonError::from(io::Error::new(ErrorKind::InvalidInput, msg)));
        }
        let mut addrs = hostname.to_socket_addrs()?;
        let addr = addrs.find(|x| x.is_ipv4()).ok_or_else(|| {
            let msg = format!("no IPv4 address for {}", hostname);
            AtonError::from(io::Error::new(ErrorKind::AddrNotAvailable, msg))
        })?;
        return Self::connect_to(addr);
    }

    pub fn connect_to(addr: SocketAddr) -> Result<Self> {
        let mut client = Client { addr, stream: None };
        client.connect()?;
        return Ok(client);
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn connect(&mut self) -> Result<()> {
        if self.stream.is_none() {
            let stream = TcpStream::connect(self.addr)?;
            stream.set_nodelay(true)?;
            self.stream = Some(BufWriter::new(stream));
        }
        return Ok(());
    }

    pub fn send(&mut self, packet: &Packet) -> Result<()> {
        self.connect()?;
        if let Some(stream) = self.stream.as_mut() {
            write_packet(stream, packet)?;
            if packet.ends_stream() {
                stream.flush()?;
            }
        }
        return Ok(());
    }

    /// Writes raw bytes, bypassing the encoder.
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.connect()?;
        if let Some(stream) = self.stream.as_mut() {
            stream.write_all(bytes)?;
        }
        return Ok(());
    }

    pub fn open_image(&mut self, open: OpenImage) -> Result<()> {
        self.send(&Packet::from(open))
    }

    pub fn send_bucket(&mut self, bucket: BucketData) -> Result<()> {
        self.send(&Packet::from(bucket))
    }

    pub fn close_image(&mut self) -> Result<()> {
        self.send(&Packet::Data(ImagePacket::Close))
    }

    pub fn terminate(&mut self) -> Result<()> {
        self.send(&Packet::Control(SessionControl::Terminate))
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.as_mut() {
            stream.flush()?;
        }
        return Ok(());
    }

    pub fn disconnect(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.flush()?;
            if let Err(e) = stream.get_ref().shutdown(Shutdown::Both) {
                // the receiver may already have hung up
                debug!("shutdown {}: {}", self.addr, e);
            }
        }
        return Ok(());
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Err(e) = self.disconnect() {
            debug!("{}", e);
        }
    }
}
