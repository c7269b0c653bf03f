//! Built-in certification suites.
//!
//! Each suite module exposes a `load_checks` function building one
//! [`ChecksGroup`] over the [`TestEnvironment`]. Check metadata lives in the
//! catalog built by [`build_catalog`].

#![warn(missing_docs)]

pub mod identifiers;
pub mod skip;
pub mod observability;
pub mod access_control;
pub mod networking;
pub mod operator;

use certsuite_core::TestEnvironment;
use certsuite_engine::{Catalog, CatalogBuilder, CatalogError, ChecksGroup, HookError};

/// `before_each` hook: reload the snapshot when something marked it stale.
pub fn refresh_environment(env: &mut TestEnvironment) -> Result<(), HookError> {
    if env.refresh_if_stale()? {
        tracing::debug!("Environment reloaded before check");
    }
    Ok(())
}

/// Catalog holding every built-in check.
pub fn build_catalog() -> Result<Catalog, CatalogError> {
    let mut builder = CatalogBuilder::new();
    builder.register_all(identifiers::catalog_entries())?;
    Ok(builder.build())
}

/// Every built-in group, in run order.
pub fn load_groups(catalog: &Catalog) -> Vec<ChecksGroup<TestEnvironment>> {
    vec![
        observability::load_checks(catalog),
        access_control::load_checks(catalog),
        networking::load_checks(catalog),
        operator::load_checks(catalog),
    ]
}
