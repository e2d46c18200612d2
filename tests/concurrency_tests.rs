//! Shared caches under concurrent first access.

mod common;

use common::fixture_app;
use std::sync::{Arc, Barrier};
use std::thread;
use tagroute::dispatcher::register_verbs;
use tagroute::metadata::{
    DeclarationId, DocSource, MetadataBuilder, MetadataError, MetadataRegistry, NativeDocs,
};
use tagroute::Request;

const THREADS: usize = 100;

/// Counts how often each declaration is looked up.
struct CountingDocs {
    inner: NativeDocs,
    lookups: std::sync::atomic::AtomicUsize,
}

impl DocSource for CountingDocs {
    fn doc_comment(&self, decl: &DeclarationId) -> Result<Option<String>, MetadataError> {
        self.lookups
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        // widen the race window
        thread::yield_now();
        self.inner.doc_comment(decl)
    }
}

#[test]
fn test_single_build_per_declaration() {
    let registry = Arc::new(MetadataRegistry::new());
    register_verbs(&registry).unwrap();
    let docs = Arc::new(CountingDocs {
        inner: NativeDocs::new().with(DeclarationId::method("Svc", "run"), "@Get\n@Post"),
        lookups: std::sync::atomic::AtomicUsize::new(0),
    });
    let builder = Arc::new(MetadataBuilder::new(
        registry,
        Arc::clone(&docs) as Arc<dyn DocSource>,
    ));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let builder = Arc::clone(&builder);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                builder.build(&DeclarationId::method("Svc", "run")).unwrap()
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.len(), THREADS);
    assert_eq!(builder.builds(), 1);
    assert!(results.iter().all(|c| Arc::ptr_eq(c, &results[0])));
    assert!(results[0].has("Dispatch_Verb_Get"));
    // one lookup for the method; the verb types are answered by the registry
    assert_eq!(docs.lookups.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_dispatch() {
    let app = Arc::new(fixture_app());
    let barrier = Arc::new(Barrier::new(16));
    let handles: Vec<_> = (0..16)
        .map(|i| {
            let app = Arc::clone(&app);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut statuses = Vec::new();
                for _ in 0..20 {
                    let get = Request::new("GET", &format!("/users/{i}"))
                        .header("Accept", "application/json");
                    let response = app.dispatcher().dispatch(&get).unwrap();
                    assert_eq!(
                        response.json().unwrap()["user"]["id"],
                        serde_json::json!(i.to_string())
                    );
                    statuses.push(response.status.as_u16());
                    let delete = Request::new("DELETE", &format!("/users/{i}"));
                    statuses.push(app.dispatcher().dispatch(&delete).unwrap().status.as_u16());
                }
                statuses
            })
        })
        .collect();
    for handle in handles {
        let statuses = handle.join().unwrap();
        assert!(statuses.chunks(2).all(|pair| pair == [200, 405]));
    }
    let metadata = app.dispatcher().metadata();
    // fetch and store of Api_Users, each built once
    assert_eq!(metadata.builds(), 2);
}
