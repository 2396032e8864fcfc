pub mod init;
pub mod serve;
pub mod show;

pub use init::{init, InitArgs};
pub use serve::{serve, ServeArgs};
pub use show::{show, ShowArgs};

use crate::config::Config;
use contentdesk_common::FileSnapshotStorage;
use contentdesk_workspace::FileGateway;

/// Open the store file named by `config`
pub(crate) fn open_store(config: &Config, cwd: &str) -> anyhow::Result<FileGateway> {
    let path = config.get_store_path(cwd);
    let gateway = FileGateway::open(Box::new(FileSnapshotStorage::new(&path)))?;
    tracing::debug!(path = %path.display(), "store opened");
    Ok(gateway)
}
