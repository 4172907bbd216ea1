use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, trace as sdktrace, Resource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes tracing with JSON output. When an OTLP endpoint is configured,
/// spans are also exported over gRPC; export failures fall back to
/// stdout-only logging instead of aborting startup.
pub fn init_tracing(service_name: &str, log_level: &str, otlp_endpoint: Option<&str>) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    match otlp_endpoint {
        Some(endpoint) => {
            let exporter = opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint.to_string());
            let pipeline = opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(exporter)
                .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                    KeyValue::new("service.name", service_name.to_string()),
                ])))
                .install_batch(runtime::Tokio);

            match pipeline {
                Ok(tracer) => {
                    let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);
                    tracing_subscriber::registry()
                        .with(env_filter)
                        .with(telemetry)
                        .with(
                            tracing_subscriber::fmt::layer()
                                .with_file(true)
                                .with_line_number(true)
                                .json()
                                .flatten_event(true),
                        )
                        .init();
                }
                Err(e) => {
                    eprintln!("Failed to initialize OTLP exporter at '{}': {}", endpoint, e);
                    tracing_subscriber::registry()
                        .with(env_filter)
                        .with(
                            tracing_subscriber::fmt::layer()
                                .with_file(true)
                                .with_line_number(true)
                                .json()
                                .flatten_event(true),
                        )
                        .init();
                }
            }
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_file(true)
                        .with_line_number(true)
                        .json()
                        .flatten_event(true),
                )
                .init();
        }
    }
}
