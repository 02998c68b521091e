//! Test Request Producer
//!
//! Generates and publishes random evaluation requests to NATS for pipeline testing.

use freshness_pipeline::types::{
    BackendInput, BackendResult, Detection, EnvironmentReading, EvaluationRequest,
};
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

const ITEMS: &[&str] = &["apple", "banana", "orange"];

/// Request generator for testing
struct RequestGenerator {
    rng: rand::rngs::ThreadRng,
    request_counter: u64,
}

impl RequestGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            request_counter: 0,
        }
    }

    fn next_id(&mut self) -> String {
        self.request_counter += 1;
        format!("req_{:012}", self.request_counter)
    }

    fn item(&mut self) -> &'static str {
        ITEMS.choose(&mut self.rng).copied().unwrap_or("apple")
    }

    /// Sensor reading for the tabular backend
    fn environment(&mut self, spoiled: bool) -> BackendInput {
        let time_stored_hours = if spoiled {
            self.rng.gen_range(48.0..168.0)
        } else {
            self.rng.gen_range(1.0..24.0)
        };
        let reading = EnvironmentReading::new(
            self.rng.gen_range(2.0..35.0),
            self.rng.gen_range(30.0..90.0),
            time_stored_hours,
        )
        .with_gas(self.rng.gen_range(100.0..500.0));
        BackendInput::Environment(reading)
    }

    /// Probability vector for the 12-class produce model
    fn probabilities(&mut self, spoiled: bool) -> BackendInput {
        let mut probabilities: Vec<f32> = (0..12).map(|_| self.rng.gen_range(0.0..0.05)).collect();
        // Even indices are fresh_ labels, odd are stale_
        let pick = self.rng.gen_range(0..6) * 2 + usize::from(spoiled);
        probabilities[pick] = self.rng.gen_range(0.5..0.99);
        BackendInput::Probabilities { probabilities }
    }

    fn multiclass(&mut self, spoiled: bool) -> BackendInput {
        let state = if spoiled { "rotten" } else { "fresh" };
        let class_label = format!("{}_{}", state, self.item());
        BackendInput::Reported {
            result: BackendResult::ImageMulticlass {
                class_label,
                confidence: self.rng.gen_range(0.5..1.0),
            },
        }
    }

    fn binary(&mut self, spoiled: bool) -> BackendInput {
        let score = if spoiled {
            self.rng.gen_range(0.35..1.0)
        } else {
            self.rng.gen_range(0.0..0.35)
        };
        BackendInput::Reported {
            result: BackendResult::ImageBinaryRegression { score },
        }
    }

    fn detections(&mut self, spoiled: bool) -> BackendInput {
        let count = self.rng.gen_range(0..5);
        let detections = (0..count)
            .map(|_| {
                let state = if spoiled && self.rng.gen_bool(0.7) { "rotten" } else { "fresh" };
                let label = format!("{}_{}", state, self.item());
                Detection::new(label, self.rng.gen_range(0.4..1.0))
            })
            .collect();
        BackendInput::Reported {
            result: BackendResult::ObjectDetection { detections },
        }
    }

    /// Generate a request for a random backend of the default configuration
    fn generate(&mut self, spoiled: bool) -> EvaluationRequest {
        let request_id = self.next_id();
        let (backend_id, input) = match self.rng.gen_range(0..5) {
            0 => ("env", self.environment(spoiled)),
            1 => ("tflite", self.probabilities(spoiled)),
            2 => ("freshvision", self.multiclass(spoiled)),
            3 => ("mobilenet", self.binary(spoiled)),
            _ => ("roboflow", self.detections(spoiled)),
        };
        EvaluationRequest::new(request_id, backend_id, input)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Request Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("freshness.requests");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let spoiled_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.3);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);
    let spoiled_rate = spoiled_rate.clamp(0.0, 1.0);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        spoiled_rate = spoiled_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    // Connect to NATS
    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, spoiled_rate, delay_ms).await;
        }
    };

    let mut generator = RequestGenerator::new();
    let mut rng = rand::thread_rng();

    info!("Starting to publish {} requests...", count);

    let mut fresh_count = 0;
    let mut spoiled_count = 0;

    for i in 0..count {
        let spoiled = rng.gen_bool(spoiled_rate);
        if spoiled {
            spoiled_count += 1;
        } else {
            fresh_count += 1;
        }
        let request = generator.generate(spoiled);

        let payload = serde_json::to_vec(&request)?;

        client.publish(subject.to_string(), payload.into()).await?;

        if (i + 1) % 10 == 0 {
            info!(
                "Published {}/{} requests ({} fresh, {} spoiled)",
                i + 1,
                count,
                fresh_count,
                spoiled_count
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    client.flush().await?;

    info!(
        "Completed! Published {} requests ({} fresh, {} spoiled)",
        count, fresh_count, spoiled_count
    );

    Ok(())
}

async fn run_dry_mode(count: u64, spoiled_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = RequestGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let request = generator.generate(rng.gen_bool(spoiled_rate));

        let json = serde_json::to_string_pretty(&request)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample request {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
