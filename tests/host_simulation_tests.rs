// End-to-end: a simulated instrumentation host drives the tracer, then the
// coverage reporter reads the resulting logs back.

#![cfg(not(feature = "loom-model"))]

use callsift::call_log::{log_path, read_records, LogRecord};
use callsift::config::TracerConfig;
use callsift::host::{instrument_image, ForkDecision, InstrumentationHooks};
use callsift::report;
use callsift::tool::FuncTracer;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

const SERVER: &str = "/opt/app/bin/server";
const CODEC: &str = "/opt/app/lib/libcodec.so";

const SERVER_ROUTINES: &[&str] = &[
    "_start",
    "_init",
    "main",
    ".plt.got",
    "malloc@plt",
    "__libc_csu_init",
    "__do_global_dtors_aux",
    "accept_loop",
    "handle_request",
    "parse_headers",
    "shutdown",
];

const CODEC_ROUTINES: &[&str] = &["_init", "encode", "decode", "__cxa_finalize@plt"];

fn config_in(dir: &Path) -> TracerConfig {
    TracerConfig {
        log_dir: dir.to_path_buf(),
        log_prefix: "callsift".to_string(),
        log_definitions: true,
    }
}

/// Minimal stand-in for a binary instrumentation runtime
struct SimulatedHost {
    hooks: Arc<dyn InstrumentationHooks>,
}

impl SimulatedHost {
    fn load_image(&self, image: &str, routines: &[&str]) -> Vec<String> {
        instrument_image(self.hooks.as_ref(), image, routines.iter().copied())
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Run `threads` threads that each enter every probed routine `rounds` times
    fn run_threads(&self, image: &str, probed: &[String], threads: usize, rounds: usize) {
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let hooks = Arc::clone(&self.hooks);
                let barrier = Arc::clone(&barrier);
                let image = image.to_string();
                let probed = probed.to_vec();
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..rounds {
                        for symbol in &probed {
                            hooks.on_function_entered(&image, symbol);
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }
}

#[test]
fn test_probes_only_relevant_routines() {
    let tmp = TempDir::new().unwrap();
    let tracer = FuncTracer::for_process(config_in(tmp.path()), 500).unwrap();
    let host = SimulatedHost {
        hooks: Arc::new(tracer),
    };

    let probed = host.load_image(SERVER, SERVER_ROUTINES);
    assert_eq!(
        probed,
        vec!["accept_loop", "handle_request", "parse_headers", "shutdown"]
    );

    let probed = host.load_image(CODEC, CODEC_ROUTINES);
    assert_eq!(probed, vec!["encode", "decode"]);
}

#[test]
fn test_many_threads_one_line_per_function() {
    let tmp = TempDir::new().unwrap();
    let tracer = FuncTracer::for_process(config_in(tmp.path()), 501).unwrap();
    let host = SimulatedHost {
        hooks: Arc::new(tracer),
    };

    let probed = host.load_image(SERVER, SERVER_ROUTINES);
    host.run_threads(SERVER, &probed[..3], 8, 50);
    host.hooks.on_exit(0).unwrap();

    let calls: Vec<_> = read_records(&log_path(tmp.path(), "callsift", 501))
        .unwrap()
        .into_iter()
        .filter(|r| matches!(r, LogRecord::Call { .. }))
        .collect();

    assert_eq!(calls.len(), 3);
    for name in ["accept_loop", "handle_request", "parse_headers"] {
        assert_eq!(
            calls.iter().filter(|r| r.function() == name).count(),
            1,
            "{} should be logged exactly once",
            name
        );
    }
}

#[test]
fn test_fork_followed_and_report_merges_processes() {
    let tmp = TempDir::new().unwrap();
    let tracer = FuncTracer::for_process(config_in(tmp.path()), 600).unwrap();
    let host = SimulatedHost {
        hooks: Arc::new(tracer),
    };

    host.load_image(SERVER, SERVER_ROUTINES);
    host.load_image(CODEC, CODEC_ROUTINES);
    host.hooks.on_function_entered(SERVER, "accept_loop");
    host.hooks.on_function_entered(CODEC, "encode");

    assert_eq!(host.hooks.on_fork_requested(601), ForkDecision::Follow);
    host.hooks.on_fork_child(601).unwrap();
    host.hooks.on_function_entered(SERVER, "handle_request");
    host.hooks.on_function_entered(SERVER, "accept_loop");
    host.hooks.on_exit(0).unwrap();

    let child = read_records(&log_path(tmp.path(), "callsift", 601)).unwrap();
    assert_eq!(child, vec![LogRecord::call(SERVER, "handle_request")]);

    let files = report::collect_log_files(tmp.path().to_str().unwrap()).unwrap();
    assert_eq!(files.len(), 2);

    let coverage = report::analyze_logs(&files).unwrap();
    let server = &coverage[SERVER];
    assert_eq!(server.total(), 4);
    assert_eq!(server.called_count(), 2);
    assert_eq!(
        server.uncalled().collect::<Vec<_>>(),
        vec!["parse_headers", "shutdown"]
    );

    let codec = &coverage[CODEC];
    assert_eq!(codec.total(), 2);
    assert_eq!(codec.called_count(), 1);
    assert!((codec.percentage() - 50.0).abs() < f64::EPSILON);
}
