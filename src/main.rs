//! `tagroute` binary: route inspection and configuration checks.
//!
//! Applications embed [`tagroute::cli::run`] with their own services; this
//! binary has none registered, so `check` and `serve` only succeed for an
//! empty service list.

fn main() -> anyhow::Result<()> {
    tagroute::cli::run(tagroute::ApplicationBuilder::new())
}
