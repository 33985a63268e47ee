//! Schema generator for the gateway event and response shapes.
//!
//! Writes `event_schema.json` with one JSON schema per wire type, handy for
//! validating captured events before replaying them through the shim.

use anyhow::{Context, Result};
use apigw_shim::models::{GatewayResponse, HttpApiRequest, ProxyRequest};
use schemars::{JsonSchema, schema_for};
use serde_json::{Value, json};
use std::fs;

const OUTPUT: &str = "event_schema.json";

// A named wire type with its description and schema
struct Shape {
    name: &'static str,
    description: &'static str,
    schema: Value,
}

fn main() -> Result<()> {
    let shapes = vec![
        Shape {
            name: "ProxyRequest",
            description: "REST API proxy event (payload format 1.0).",
            schema: generate_schema::<ProxyRequest>()?,
        },
        Shape {
            name: "HttpApiRequest",
            description: "HTTP API event (payload format 2.0).",
            schema: generate_schema::<HttpApiRequest>()?,
        },
        Shape {
            name: "GatewayResponse",
            description: "Response returned to API Gateway for either payload format.",
            schema: generate_schema::<GatewayResponse>()?,
        },
    ];

    write_schema(&shapes)?;
    println!("✅ Generated {OUTPUT} with {} shape(s)", shapes.len());
    Ok(())
}

// Generates a schema for the given type, without the meta-schema marker
fn generate_schema<T: JsonSchema>() -> Result<Value> {
    let mut schema = serde_json::to_value(schema_for!(T)).context("Failed to serialize schema")?;
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
    }
    Ok(schema)
}

fn write_schema(shapes: &[Shape]) -> Result<()> {
    let schemas: Vec<Value> = shapes
        .iter()
        .map(|shape| {
            json!({
                "name": shape.name,
                "description": shape.description,
                "schema": shape.schema,
            })
        })
        .collect();

    let json = serde_json::to_string_pretty(&schemas).context("Failed to serialize schemas")?;
    fs::write(OUTPUT, json).with_context(|| format!("Failed to write {OUTPUT}"))
}
