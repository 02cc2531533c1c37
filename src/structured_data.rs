//! schema.org structured data for the rendered page.
//!
//! Search engines read `<script type="application/ld+json">` blocks from the
//! page head. The build emits a fixed set of records, in this order:
//!
//! 1. the business (type from `identity.business_type`)
//! 2. the person behind it
//! 3. an `FAQPage` built from `faq.items`, when present
//! 4. one `Service` per entry of `services.items`, when present
//!
//! Identity values come from `site.toml`; description, phone, questions and
//! services come from the content document, so an edit published through the
//! editor shows up in the structured data on the next build.
//!
//! Each record is serialized on its own as pretty JSON with sorted keys, so
//! the output is byte-stable for a given input. Empty values are left out of
//! the records rather than emitted as empty strings.

use crate::config::IdentityConfig;
use crate::path::resolve;
use crate::template::text_of;
use log::warn;
use maud::{PreEscaped, html};
use serde_json::{Map, Value, json};

const SCHEMA_CONTEXT: &str = "https://schema.org";

/// Build every structured-data record and wrap each in its script block.
pub fn generate(content: &Value, identity: &IdentityConfig) -> Vec<String> {
    records(content, identity).iter().map(script_block).collect()
}

/// The records in emission order, before serialization.
pub fn records(content: &Value, identity: &IdentityConfig) -> Vec<Value> {
    let mut records = vec![business_record(content, identity), person_record(identity)];

    if let Some(Value::Array(items)) = resolve(content, "faq.items") {
        records.push(faq_record(items));
    }

    if let Some(Value::Array(items)) = resolve(content, "services.items") {
        records.extend(items.iter().map(|service| service_record(service, identity)));
    }

    records
}

/// Serialize one record into a `<script type="application/ld+json">` block.
pub fn script_block(record: &Value) -> String {
    let json = serde_json::to_string_pretty(record)
        .unwrap_or_default()
        // Keep content strings from closing the script element early.
        .replace("</", "<\\/");
    html! {
        script type="application/ld+json" {
            (PreEscaped(format!("\n{json}\n")))
        }
    }
    .into_string()
}

/// Insert the blocks just before the first `</head>`.
///
/// A template without a `</head>` is returned unchanged.
pub fn inject(html: &str, blocks: &[String]) -> String {
    if blocks.is_empty() {
        return html.to_string();
    }
    match html.find("</head>") {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + blocks.iter().map(String::len).sum::<usize>());
            out.push_str(&html[..pos]);
            out.push_str(&blocks.join("\n"));
            out.push('\n');
            out.push_str(&html[pos..]);
            out
        }
        None => {
            warn!("template has no </head>; structured data not injected");
            html.to_string()
        }
    }
}

// ============================================================================
// Records
// ============================================================================

fn record(schema_type: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("@context".to_string(), json!(SCHEMA_CONTEXT));
    map.insert("@type".to_string(), json!(schema_type));
    map
}

fn typed(schema_type: &str, name: &str) -> Value {
    json!({ "@type": schema_type, "name": name })
}

fn put_text(map: &mut Map<String, Value>, key: &str, value: &str) {
    if !value.is_empty() {
        map.insert(key.to_string(), json!(value));
    }
}

fn put_typed_list(map: &mut Map<String, Value>, key: &str, schema_type: &str, names: &[String]) {
    if !names.is_empty() {
        let list = names.iter().map(|n| typed(schema_type, n)).collect();
        map.insert(key.to_string(), Value::Array(list));
    }
}

fn business_record(content: &Value, identity: &IdentityConfig) -> Value {
    let mut map = record(&identity.business_type);
    put_text(&mut map, "name", &identity.business_name);
    put_text(&mut map, "description", &text_of(resolve(content, "meta.description")));
    put_text(&mut map, "url", &identity.url);
    put_text(&mut map, "telephone", &text_of(resolve(content, "contact.phone")));
    put_typed_list(&mut map, "areaServed", "City", &identity.areas_served);

    let mut address = Map::new();
    put_text(&mut address, "addressLocality", &identity.locality);
    put_text(&mut address, "addressRegion", &identity.region);
    put_text(&mut address, "addressCountry", &identity.country);
    if !address.is_empty() {
        address.insert("@type".to_string(), json!("PostalAddress"));
        map.insert("address".to_string(), Value::Object(address));
    }

    Value::Object(map)
}

fn person_record(identity: &IdentityConfig) -> Value {
    let mut map = record("Person");
    put_text(&mut map, "name", &identity.person_name);
    put_text(&mut map, "jobTitle", &identity.job_title);
    put_typed_list(&mut map, "alumniOf", "CollegeOrUniversity", &identity.alumni);
    if !identity.works_for.is_empty() {
        map.insert(
            "worksFor".to_string(),
            typed("Organization", &identity.works_for),
        );
    }
    if !identity.knows_about.is_empty() {
        map.insert("knowsAbout".to_string(), json!(identity.knows_about));
    }
    Value::Object(map)
}

fn faq_record(items: &[Value]) -> Value {
    let questions = items
        .iter()
        .map(|item| {
            let mut question = Map::new();
            question.insert("@type".to_string(), json!("Question"));
            put_text(&mut question, "name", &text_of(resolve(item, "question")));
            let mut answer = Map::new();
            answer.insert("@type".to_string(), json!("Answer"));
            put_text(&mut answer, "text", &text_of(resolve(item, "answer")));
            question.insert("acceptedAnswer".to_string(), Value::Object(answer));
            Value::Object(question)
        })
        .collect();

    let mut map = record("FAQPage");
    map.insert("mainEntity".to_string(), Value::Array(questions));
    Value::Object(map)
}

fn service_record(service: &Value, identity: &IdentityConfig) -> Value {
    let mut map = record("Service");
    put_text(&mut map, "name", &text_of(resolve(service, "title")));
    put_text(&mut map, "description", &text_of(resolve(service, "description")));
    if !identity.person_name.is_empty() {
        map.insert("provider".to_string(), typed("Person", &identity.person_name));
    }
    if let Some(area) = identity.areas_served.first() {
        map.insert("areaServed".to_string(), typed("City", area));
    }
    Value::Object(map)
}
