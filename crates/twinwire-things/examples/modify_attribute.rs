//! Walk one attribute change through the protocol: command, wire form,
//! dispatch, response and event

use serde_json::json;
use tracing_subscriber::EnvFilter;
use twinwire_core::{
    CommandResponse, EntityId, FieldPredicate, Headers, JsonPointer, ProtocolConfig,
    SchemaVersion, Signal, WithRevision,
};
use twinwire_things::{
    decode_str, encode, AttributeModified, ModifyAttribute, ModifyAttributeResponse, TwinSignal,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    ProtocolConfig::from_env()?.install()?;

    println!("=== TwinWire attribute change ===\n");

    let headers = Headers::new()
        .ensure_correlation_id()
        .with_auth_subjects(["demo:operator"]);
    let command = ModifyAttribute::new(
        EntityId::thing("org.example:lamp-1")?,
        JsonPointer::parse("/color")?,
        json!("red"),
        headers,
    )?;
    println!("Command {} on {}", command.type_tag(), command.resource_path());

    // Render for transport at V2, leaving out hidden fields
    let wire = encode(&command, SchemaVersion::V2, &FieldPredicate::not_hidden());
    let text = serde_json::to_string_pretty(&wire)?;
    println!("\nWire form:\n{text}");

    // The receiving side only knows it got some signal
    let received = match decode_str(&text, command.headers())? {
        TwinSignal::ModifyAttribute(received) => received,
        other => anyhow::bail!("dispatched to {:?}", other.kind()),
    };
    println!("\nDecoded {} for {}", received.type_tag(), received.entity_id());

    let response = ModifyAttributeResponse::modified(&received)?;
    println!(
        "Response {} with status {}",
        response.type_tag(),
        response.http_status()
    );

    let event = AttributeModified::from_command(&received, 1, Some(chrono::Utc::now()))?;
    let event = event.with_revision(event.revision() + 1);
    println!(
        "Event {} at revision {}:\n{}",
        event.type_tag(),
        event.revision(),
        serde_json::to_string_pretty(&encode(&event, SchemaVersion::V2, &FieldPredicate::always()))?
    );

    Ok(())
}
