//! Creates a model and a sampling session against a running service, runs
//! one training step, then samples from the resulting weights.
//!
//! Requires a real `TINKER_API_KEY` and `TINKER_BASE_URL`; this is meant to
//! be read, not run in CI.

use tinker::core::config::Config;
use tinker::core::estimate::{Chunk, Datum, ModelInput};
use tinker::sampling::{SampleOpts, SamplingCoordinatorConfig};
use tinker::training::TrainingCoordinatorConfig;
use tinker::{Client, ClientConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let base_url = std::env::var("TINKER_BASE_URL").unwrap_or_else(|_| "https://api.tinker.example.com".to_string());
    let credential = std::env::var("TINKER_API_KEY")?;

    // Left unset: requests go through `PoolRouter`'s own per-pool `reqwest`
    // clients. Call `.transport(...)` to route through a custom transport
    // instead.
    let core = Config::builder()
        .base_url(base_url)
        .credential(credential)
        .build()?;

    let client = Client::with_defaults(core)?;

    let model = client
        .create_model(
            "meta-llama/Llama-3.1-8B",
            serde_json::json!({ "lora_rank": 32 }),
            TrainingCoordinatorConfig::builder()
                .model_id("meta-llama/Llama-3.1-8B")
                .build(),
        )
        .await?;

    let datum = Datum::new(ModelInput::new(vec![Chunk::EncodedText {
        token_ids: vec![1, 2, 3, 4, 5],
    }]));
    let result = model.forward_backward(vec![datum]).await?;
    println!("training step metrics: {:?}", result.metrics);

    model.optim_step(serde_json::json!({ "learning_rate": 1e-4 })).await?;
    let weights = model
        .save_weights_for_sampler(serde_json::json!({ "name": "checkpoint-1" }))
        .await?;
    println!("saved weights: {weights}");

    let sampler = client
        .create_sampling_session(
            serde_json::json!({ "model_path": weights }),
            SamplingCoordinatorConfig::builder().build(),
        )
        .await?;

    let sample = sampler
        .sample(
            serde_json::json!({ "token_ids": [1, 2, 3] }),
            serde_json::json!({ "max_tokens": 64 }),
            SampleOpts {
                num_samples: Some(1),
                ..Default::default()
            },
        )
        .await?;
    println!("sample: {sample}");

    Ok(())
}
