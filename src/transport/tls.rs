//! TLS context construction for the TCP transport.
//!
//! Contexts are built once, from a pre-configured cert+key (server) or CA
//! bundle (client), and reused for every connection a [`super::TcpTransport`]
//! makes. There is no certificate rotation or renegotiation here — load a
//! new [`TlsServerConfig`]/[`TlsClientConfig`] and rebuild the transport if
//! the material changes.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use tokio_rustls::rustls::{ClientConfig, RootCertStore, ServerConfig};

use crate::error::{Error, TransportError};

/// The certificate chain and private key a server presents to TLS clients.
#[derive(Debug, Clone)]
pub struct TlsServerConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl TlsServerConfig {
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> TlsServerConfig {
        TlsServerConfig { cert_path: cert_path.into(), key_path: key_path.into() }
    }
}

/// The CA bundle and expected server name a client verifies its peer
/// against.
#[derive(Debug, Clone)]
pub struct TlsClientConfig {
    pub ca_path: PathBuf,
    pub server_name: String,
}

impl TlsClientConfig {
    pub fn new(ca_path: impl Into<PathBuf>, server_name: impl Into<String>) -> TlsClientConfig {
        TlsClientConfig { ca_path: ca_path.into(), server_name: server_name.into() }
    }
}

pub(crate) fn build_server_config(cfg: &TlsServerConfig) -> Result<ServerConfig, Error> {
    let certs = load_certs(&cfg.cert_path)?;
    let key = load_key(&cfg.key_path)?;
    ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|err| TransportError::Tls(err.to_string()).into())
}

pub(crate) fn build_client_config(cfg: &TlsClientConfig) -> Result<(ClientConfig, ServerName<'static>), Error> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(&cfg.ca_path)? {
        roots.add(cert).map_err(|err| TransportError::Tls(err.to_string()))?;
    }
    let config = ClientConfig::builder().with_root_certificates(roots).with_no_client_auth();
    let name = ServerName::try_from(cfg.server_name.clone())
        .map_err(|err| TransportError::Tls(format!("invalid server name {:?}: {err}", cfg.server_name)))?;
    Ok((config, name))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, Error> {
    let file = File::open(path).map_err(TransportError::Io)?;
    rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| TransportError::Tls(format!("reading {}: {err}", path.display())).into())
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, Error> {
    let file = File::open(path).map_err(TransportError::Io)?;
    rustls_pemfile::private_key(&mut BufReader::new(file))
        .map_err(|err| TransportError::Tls(format!("reading {}: {err}", path.display())))?
        .ok_or_else(|| TransportError::Tls(format!("no private key found in {}", path.display())).into())
}
