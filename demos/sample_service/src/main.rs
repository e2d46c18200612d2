//! Sample application: four services routed by `config/app.yaml`.
//!
//! ```text
//! cargo run -p sample_service -- serve --config demos/sample_service/config/app.yaml
//! curl -H 'Accept: application/json' http://127.0.0.1:8080/complex/abc/2.5?q=1
//! ```

mod services;

use tagroute::metadata::SourceDocs;
use tagroute::ApplicationBuilder;

fn application() -> ApplicationBuilder {
    let docs = SourceDocs::new().with_unit("services.rs", include_str!("services.rs"));
    services::all()
        .into_iter()
        .fold(ApplicationBuilder::new().doc_source(docs), ApplicationBuilder::service)
}

fn main() -> anyhow::Result<()> {
    tagroute::cli::run(application())
}
