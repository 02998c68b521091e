//! Freshness Pipeline - Main Entry Point
//!
//! Consumes evaluation requests from NATS, runs the configured freshness
//! backends, and publishes normalized verdicts.

use anyhow::{Context, Result};
use freshness_pipeline::{
    config::{AppConfig, LoggingConfig},
    consumer::{decode_request, reject_payload, RequestConsumer},
    metrics::{MetricsReporter, PipelineMetrics},
    models::inference::InferenceEngine,
    producer::VerdictProducer,
    types::VerdictEnvelope,
};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("freshness_pipeline={}", logging.level).parse()?);

    if logging.format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().pretty().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Freshness Pipeline");
    config.validate().context("Invalid configuration")?;
    info!(
        backends = ?config.backend_ids(),
        fresh_threshold = config.normalization.fresh_threshold,
        medium_threshold = config.normalization.medium_threshold,
        "Configuration loaded successfully"
    );

    // Initialize metrics
    let metrics = Arc::new(PipelineMetrics::new());

    // Backends load lazily on first use
    let inference_engine = Arc::new(InferenceEngine::new(&config)?);
    info!(
        "Inference engine initialized with {} backends: {:?}",
        inference_engine.backend_count(),
        inference_engine.backend_ids()
    );

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    // Initialize consumer and producer
    let consumer = RequestConsumer::new(
        client.clone(),
        &config.nats.request_subject,
        &config.nats.health_subject,
    );
    let producer = Arc::new(VerdictProducer::new(client.clone(), &config.nats.verdict_subject));

    // Answer health probes
    let mut health_subscription = consumer.subscribe_health().await?;
    let health_engine = inference_engine.clone();
    let health_producer = producer.clone();
    tokio::spawn(async move {
        while let Some(message) = health_subscription.next().await {
            let Some(reply) = message.reply else {
                debug!("Ignoring health probe without reply subject");
                continue;
            };
            let reports = health_engine.health_reports().await;
            if let Err(e) = health_producer.reply_health(reply, &reports).await {
                warn!(error = %e, "Failed to answer health probe");
            }
        }
    });

    let num_workers = config.pipeline.workers;
    info!(
        "Starting request processing loop with {} parallel workers",
        num_workers
    );
    info!("Listening on subject: {}", consumer.subject());
    info!("Answering health probes on: {}", consumer.health_subject());
    info!("Publishing verdicts to: {}", producer.subject());

    // Semaphore to limit concurrent processing
    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));

    // Start metrics reporter
    let metrics_clone = metrics.clone();
    let interval_secs = config.pipeline.metrics_interval_secs;
    tokio::spawn(async move {
        let reporter = MetricsReporter::new(metrics_clone, interval_secs);
        reporter.start().await;
    });

    let mut subscription = consumer.subscribe().await?;

    loop {
        let message = tokio::select! {
            message = subscription.next() => match message {
                Some(message) => message,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        };

        // Acquire permit (limits concurrent tasks)
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .context("Worker semaphore closed")?;

        let inference_engine = inference_engine.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let processed_count = processed_count.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();

            let request = match decode_request(&message.payload) {
                Ok(request) => request,
                Err(e) => {
                    let envelope = reject_payload(&message.payload, &e);
                    let processing_time = start_time.elapsed();
                    metrics.record_error(processing_time, "invalid_input");
                    warn!(
                        request_id = %envelope.request_id,
                        error = %format!("{:#}", e),
                        "Rejecting undecodable request"
                    );
                    let envelope =
                        envelope.with_processing_time(processing_time.as_micros() as u64);
                    if let Err(e) = producer.publish(&envelope).await {
                        error!(error = %e, "Failed to publish rejection");
                    }
                    drop(permit);
                    return;
                }
            };

            let result = inference_engine
                .evaluate_with_fallback(&request.backend_id, request.input.clone())
                .await;
            let processing_time = start_time.elapsed();

            let mut assessment = None;
            let verdict = match result {
                Ok(prediction) => {
                    metrics.record_backend_time(&prediction.backend_id, prediction.inference_time);
                    metrics.record_verdict(processing_time, &prediction.verdict);
                    debug!(
                        request_id = %request.request_id,
                        backend = %prediction.backend_id,
                        classification = %prediction.verdict.classification,
                        freshness_index = prediction.verdict.freshness_index,
                        grade = %prediction.assessment.grade,
                        approved = prediction.assessment.is_approved(),
                        processing_time_us = processing_time.as_micros() as u64,
                        "Request evaluated"
                    );
                    assessment = Some(prediction.assessment);
                    Ok(prediction.verdict)
                }
                Err(e) => {
                    metrics.record_error(processing_time, e.category());
                    if e.is_client_error() {
                        warn!(
                            request_id = %request.request_id,
                            backend = %request.backend_id,
                            error = %e,
                            "Request rejected"
                        );
                    } else {
                        error!(
                            request_id = %request.request_id,
                            backend = %request.backend_id,
                            category = e.category(),
                            error = %e,
                            "Evaluation failed"
                        );
                    }
                    Err(e)
                }
            };

            let mut envelope = VerdictEnvelope::new(&request, &verdict)
                .with_processing_time(processing_time.as_micros() as u64);
            if let Some(assessment) = assessment {
                envelope = envelope.with_assessment(assessment);
            }
            if let Err(e) = producer.publish(&envelope).await {
                error!(
                    request_id = %request.request_id,
                    error = %e,
                    "Failed to publish verdict"
                );
            }

            let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;

            // Log progress every 100 requests
            if count % 100 == 0 {
                let processing_stats = metrics.processing_stats();
                info!(
                    processed = count,
                    throughput = format!("{:.1} req/s", metrics.throughput()),
                    avg_latency_us = processing_stats.mean_us,
                    "Processing milestone"
                );
            }

            // Release permit when done
            drop(permit);
        });
    }

    // Wait for in-flight requests
    let _ = semaphore.acquire_many(num_workers as u32).await;

    info!("Pipeline shutting down...");
    let released = inference_engine.shutdown();
    info!(released = released, "Backends released");
    if let Err(e) = client.flush().await {
        warn!(error = %e, "Failed to flush NATS client");
    }
    metrics.print_summary();

    Ok(())
}
