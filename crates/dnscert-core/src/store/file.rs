// # File Store
//
// Directory-based implementation of AccountStore and CertificateStore.
//
// ## Layout
//
// ```text
// <root>/
// ├── .letsencrypt/<ca-host>/<email>/
// │   ├── account.json      registration resource
// │   └── account.key       account private key (PEM)
// └── certificates/<name>/
//     ├── <name>.json       metadata only, no key material
//     ├── <name>.crt        certificate chain
//     ├── <name>.key        private key
//     └── <name>.pem        chain followed by key
// ```
//
// ## Durability
//
// - Atomic writes: every file is written to a temporary sibling, flushed,
//   then renamed into place
// - Private keys are created owner-only on unix
// - Names are used as single path components; separators are rejected

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::Error;
use crate::config::validate_path_component;
use crate::traits::store::{Account, AccountStore, CertificateResource, CertificateStore};

const ACCOUNT_DIR: &str = ".letsencrypt";
const CERT_DIR: &str = "certificates";
const ACCOUNT_FILE: &str = "account.json";
const ACCOUNT_KEY_FILE: &str = "account.key";

/// Serialized account file
#[derive(Debug, Serialize, Deserialize)]
struct AccountFile {
    email: String,
    #[serde(default)]
    registration: Option<serde_json::Value>,
}

/// Directory-based account and certificate store
///
/// # Example
///
/// ```rust,no_run
/// use dnscert_core::store::FileStore;
/// use dnscert_core::traits::CertificateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStore::new("/var/lib/dnscert");
///
///     match store.get_certificate("web").await? {
///         Some(cert) => println!("{} is stored", cert.domain),
///         None => println!("nothing issued yet"),
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a store rooted at `root`
    ///
    /// Directories are created on first write.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn account_dir(&self, email: &str, host: &str) -> Result<PathBuf, Error> {
        validate_path_component(host).map_err(|e| Error::store(format!("Invalid CA host: {}", e)))?;
        validate_path_component(email).map_err(|e| Error::store(format!("Invalid email: {}", e)))?;
        Ok(self.root.join(ACCOUNT_DIR).join(host).join(email))
    }

    fn cert_dir(&self, name: &str) -> Result<PathBuf, Error> {
        validate_path_component(name)
            .map_err(|e| Error::store(format!("Invalid certificate name: {}", e)))?;
        Ok(self.root.join(CERT_DIR).join(name))
    }

    /// Path of one certificate file, e.g. `certificates/web/web.crt`
    pub fn cert_file(&self, name: &str, extension: &str) -> Result<PathBuf, Error> {
        Ok(self.cert_dir(name)?.join(format!("{}.{}", name, extension)))
    }

    async fn ensure_dir(dir: &Path) -> Result<(), Error> {
        fs::create_dir_all(dir).await.map_err(|e| {
            Error::store(format!("Failed to create directory {}: {}", dir.display(), e))
        })
    }

    /// Read a file, mapping "not found" to `None`
    async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, Error> {
        match fs::read(path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::store(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn read_required(path: &Path) -> Result<Vec<u8>, Error> {
        fs::read(path)
            .await
            .map_err(|e| Error::store(format!("Failed to read {}: {}", path.display(), e)))
    }

    /// Write a file atomically (temp file, flush, rename)
    async fn write_atomic(path: &Path, data: &[u8], private: bool) -> Result<(), Error> {
        let temp_path = temp_path(path);
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            if private {
                restrict_permissions(&temp_path).await?;
            }

            file.write_all(data).await.map_err(|e| {
                Error::store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        fs::rename(&temp_path, path).await.map_err(|e| {
            Error::store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::trace!("Wrote {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl AccountStore for FileStore {
    async fn load_account(&self, email: &str, host: &str) -> Result<Option<Account>, Error> {
        let dir = self.account_dir(email, host)?;
        let Some(json) = Self::read_optional(&dir.join(ACCOUNT_FILE)).await? else {
            tracing::debug!("No account stored in {}", dir.display());
            return Ok(None);
        };

        let file: AccountFile = serde_json::from_slice(&json).map_err(|e| {
            Error::store(format!(
                "Failed to parse {}: {}",
                dir.join(ACCOUNT_FILE).display(),
                e
            ))
        })?;
        let key = Self::read_required(&dir.join(ACCOUNT_KEY_FILE)).await?;
        let key_pem = String::from_utf8(key)
            .map_err(|_| Error::store(format!("Account key in {} is not PEM", dir.display())))?;

        Ok(Some(Account::new(file.email, file.registration, key_pem)))
    }

    async fn save_account(&self, email: &str, host: &str, account: &Account) -> Result<(), Error> {
        let dir = self.account_dir(email, host)?;
        let _guard = self.write_lock.lock().await;
        Self::ensure_dir(&dir).await?;

        let file = AccountFile {
            email: account.email.clone(),
            registration: account.registration.clone(),
        };
        let json = serde_json::to_vec_pretty(&file)
            .map_err(|e| Error::store(format!("Failed to serialize account: {}", e)))?;

        Self::write_atomic(&dir.join(ACCOUNT_KEY_FILE), account.key_pem.as_bytes(), true).await?;
        Self::write_atomic(&dir.join(ACCOUNT_FILE), &json, false).await
    }
}

#[async_trait]
impl CertificateStore for FileStore {
    async fn get_certificate(&self, name: &str) -> Result<Option<CertificateResource>, Error> {
        let meta_path = self.cert_file(name, "json")?;
        let Some(json) = Self::read_optional(&meta_path).await? else {
            return Ok(None);
        };

        let mut cert: CertificateResource = serde_json::from_slice(&json).map_err(|e| {
            Error::store(format!("Failed to parse {}: {}", meta_path.display(), e))
        })?;
        cert.certificate = Self::read_required(&self.cert_file(name, "crt")?).await?;
        cert.private_key = Self::read_required(&self.cert_file(name, "key")?).await?;

        Ok(Some(cert))
    }

    async fn store_certificate(
        &self,
        name: &str,
        certificate: &CertificateResource,
    ) -> Result<(), Error> {
        let dir = self.cert_dir(name)?;
        let _guard = self.write_lock.lock().await;
        Self::ensure_dir(&dir).await?;

        // Key material never goes into the metadata file
        let json = serde_json::to_vec_pretty(certificate)
            .map_err(|e| Error::store(format!("Failed to serialize certificate: {}", e)))?;

        let mut combined = certificate.certificate.clone();
        combined.push(b'\n');
        combined.extend_from_slice(&certificate.private_key);

        Self::write_atomic(&self.cert_file(name, "json")?, &json, false).await?;
        Self::write_atomic(&self.cert_file(name, "crt")?, &certificate.certificate, false).await?;
        Self::write_atomic(&self.cert_file(name, "pem")?, &combined, true).await?;
        Self::write_atomic(&self.cert_file(name, "key")?, &certificate.private_key, true).await?;

        tracing::debug!(cert = %name, "Stored certificate in {}", dir.display());
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<(), Error> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .map_err(|e| {
            Error::store(format!(
                "Failed to restrict permissions on {}: {}",
                path.display(),
                e
            ))
        })
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<(), Error> {
    Ok(())
}
