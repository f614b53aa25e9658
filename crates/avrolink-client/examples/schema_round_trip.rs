//! Schema Round Trip Example
//!
//! Registers a schema, frames a value the way a producer would, then decodes
//! it the way a consumer would. Point it at a running registry:
//!
//! ```text
//! SCHEMA_REGISTRY_URLS=http://localhost:8081 \
//!     cargo run -p avrolink-client --example schema_round_trip
//! ```
//!
//! Message format on wire:
//! `[0x00][schema_id: 4 bytes big-endian][avro_data...]`

use avrolink_client::{RegistryApi, RegistryConfig, SchemaResolver};
use tracing_subscriber::EnvFilter;

const ORDER_SCHEMA: &str = r#"{
    "type": "record",
    "name": "Order",
    "fields": [
        {"name": "order_id", "type": "string"},
        {"name": "amount", "type": "double"}
    ]
}"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("avrolink_client=debug".parse()?))
        .init();

    let resolver = SchemaResolver::new(RegistryConfig::from_env()?)?;

    let bytes = resolver
        .encode_json_for_send(
            "orders-value",
            ORDER_SCHEMA,
            r#"{"order_id": "order-123", "amount": 42.5}"#,
        )
        .await?;
    println!("framed {} bytes: {:02x?}", bytes.len(), &bytes[..]);

    let record = resolver.decode_received(&bytes).await?;
    println!("schema {} -> {}", record.schema_id, record.text);

    let registry = resolver.registry();
    for subject in registry.list_subjects().await? {
        println!("{}: versions {:?}", subject, registry.list_versions(&subject).await?);
    }

    Ok(())
}
