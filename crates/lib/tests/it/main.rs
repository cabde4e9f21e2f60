/*! Integration tests for Objext.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - path: Tests for the path codec and the path! macro
 * - tree: Tests for reads, writes and node handles
 * - dispatch: Tests for listeners, bubbling, batching and silence
 * - computed: Tests for computed properties and dependency tracking
 * - snapshot: Tests for commit, reset and revert
 * - validate: Tests for validation rules, strict mode and deferred checks
 * - list: Tests for sequence handles
 * - lock: Tests for read-only nodes
 * - scenarios: End-to-end flows combining the above
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("objext=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod computed;
mod dispatch;
mod helpers;
mod lock;
mod scenarios;
mod tree;
