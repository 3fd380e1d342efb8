// Library root: the store handle, query session and insight dispatch used by
// the `crease` binary and its integration tests.

pub mod cli;
pub mod handle;
pub mod insight;
pub mod session;
