/*! Integration tests for ftpacct.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - store: Creation, deletion, lookup and enumeration on the AccountStore
 * - user: Field accessors and mutators on User handles
 * - groups: The group registry and user memberships
 * - credits: Default and section credit balances
 * - masks: IP masks, address admission and login
 * - persistence: Reopening file-backed stores, corruption handling and locking
 * - concurrency: Uniqueness and credit invariants under parallel callers
 * - scenario: End-to-end account administration walkthroughs
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("ftpacct=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod concurrency;
mod masks;
mod scenario;
mod store;
mod user;
