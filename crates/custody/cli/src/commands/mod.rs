//! CLI command implementations

pub mod lifecycle;
pub mod query;
pub mod replay;

use crate::state::Session;
use anyhow::Result;
use custody_runtime::MultisigWallet;
use custody_types::CustodyResult;
use std::path::Path;

/// Run `f` against the wallet at `path` and persist the result.
///
/// The state file is written back even when `f` fails, since a failed
/// execution still journals its attempt.
pub fn with_session<T>(
    path: &Path,
    f: impl FnOnce(&MultisigWallet) -> CustodyResult<T>,
) -> Result<T> {
    let mut session = Session::open(path)?;
    let result = f(session.wallet());
    session.save()?;
    Ok(result?)
}
