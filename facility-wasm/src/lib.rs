//! Framework-neutral WASM <-> JavaScript bridge for the facility pipeline.

use facility_core::{
    Facility, FacilityError, FacilityStatus, FilterSpecification, Locale, ReferencePresets,
    RegistryConfig, StatusVocabulary,
};
use facility_registry::{
    normalize_documents_value, validate_form, Aggregator, FacilityForm, FilterEngine,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

/// Partial configuration from JavaScript; unset fields keep their defaults.
#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct JsRegistryConfig {
    search_min_chars: Option<usize>,
    acronym_max_len: Option<usize>,
    presets: Option<ReferencePresets>,
    statuses: Option<StatusVocabulary>,
}

impl From<JsRegistryConfig> for RegistryConfig {
    fn from(cfg: JsRegistryConfig) -> Self {
        let mut base = RegistryConfig::default();
        if let Some(chars) = cfg.search_min_chars {
            base.search_min_chars = chars;
        }
        if let Some(len) = cfg.acronym_max_len {
            base.tables.labels.acronym_max_len = len;
        }
        if let Some(presets) = cfg.presets {
            base.presets = presets;
        }
        if let Some(statuses) = cfg.statuses {
            base.tables.statuses = statuses;
        }
        base
    }
}

fn read_config(config: Option<JsValue>) -> Result<RegistryConfig, JsValue> {
    match config {
        Some(js_cfg) if !js_cfg.is_undefined() && !js_cfg.is_null() => {
            let cfg: JsRegistryConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Unable to read config: {err}")))?;
            Ok(RegistryConfig::from(cfg))
        }
        _ => Ok(RegistryConfig::default()),
    }
}

fn read<T: DeserializeOwned>(value: JsValue, what: &str) -> Result<T, JsValue> {
    from_value(value).map_err(|err| JsValue::from_str(&format!("Unable to read {what}: {err}")))
}

fn write<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|err| JsValue::from_str(&format!("Unable to serialize result: {err}")))
}

fn format_facility_error(err: FacilityError) -> JsValue {
    JsValue::from_str(&format!("Facility error: {err}"))
}

/// Raw backend documents to canonical facilities.
#[wasm_bindgen(js_name = normalizeDocuments)]
pub fn normalize_documents(
    documents: JsValue,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let documents: serde_json::Value = read(documents, "documents")?;
    let cfg = read_config(config)?;
    let facilities =
        normalize_documents_value(&documents, &cfg).map_err(format_facility_error)?;
    write(&facilities)
}

#[wasm_bindgen(js_name = filterFacilities)]
pub fn filter_facilities(
    facilities: JsValue,
    spec: JsValue,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    let facilities: Vec<Facility> = read(facilities, "facilities")?;
    let spec: FilterSpecification = read(spec, "filter")?;
    let engine = FilterEngine::from_config(&read_config(config)?);
    write(&engine.filter(&facilities, &spec))
}

/// Backend query constraints for a filter, for callers that query the store directly.
#[wasm_bindgen(js_name = compileFilter)]
pub fn compile_filter(spec: JsValue, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    let spec: FilterSpecification = read(spec, "filter")?;
    let engine = FilterEngine::from_config(&read_config(config)?);
    write(&engine.compile(&spec))
}

#[wasm_bindgen(js_name = buildStats)]
pub fn build_stats(facilities: JsValue, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    let facilities: Vec<Facility> = read(facilities, "facilities")?;
    let cfg = read_config(config)?;
    write(&Aggregator::new(cfg.tables.owner_categories).build_stats(&facilities))
}

#[wasm_bindgen(js_name = referenceOptions)]
pub fn reference_options(facilities: JsValue, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    let facilities: Vec<Facility> = read(facilities, "facilities")?;
    let cfg = read_config(config)?;
    write(&facility_registry::derive_reference_options(
        &facilities,
        &cfg.presets,
        &cfg.tables.labels,
    ))
}

/// Field errors for a form payload, or `null` when it is valid.
#[wasm_bindgen(js_name = validateForm)]
pub fn validate_facility_form(form: JsValue) -> Result<JsValue, JsValue> {
    let form: FacilityForm = read(form, "form")?;
    match validate_form(&form) {
        Ok(()) => Ok(JsValue::NULL),
        Err(FacilityError::Validation(report)) => write(&report),
        Err(err) => Err(format_facility_error(err)),
    }
}

#[wasm_bindgen(js_name = displayStatus)]
pub fn display_status(
    status: &str,
    locale: &str,
    config: Option<JsValue>,
) -> Result<String, JsValue> {
    let cfg = read_config(config)?;
    let locale = locale.parse::<Locale>().unwrap_or_default();
    let status = FacilityStatus::from_token(status).unwrap_or(FacilityStatus::Unknown);
    Ok(cfg.tables.statuses.display(status, locale).to_string())
}

/// Human label for a raw source status, or the raw text when no label is known.
#[wasm_bindgen(js_name = translateStatusLabel)]
pub fn translate_status_label(
    raw: &str,
    locale: &str,
    config: Option<JsValue>,
) -> Result<String, JsValue> {
    let cfg = read_config(config)?;
    let locale = locale.parse::<Locale>().unwrap_or_default();
    Ok(cfg.tables.statuses.translate_label(raw, locale))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: JsRegistryConfig =
            serde_json::from_value(serde_json::json!({ "searchMinChars": 3 })).expect("config");
        let cfg = RegistryConfig::from(cfg);

        assert_eq!(cfg.search_min_chars, 3);
        assert_eq!(cfg.tables.labels.acronym_max_len, 5);
        assert!(cfg.fallback_enabled);
    }

    fn label(result: Result<String, JsValue>) -> String {
        result.expect("label lookup")
    }

    #[test]
    fn status_labels_follow_locale() {
        assert_eq!(label(display_status("operational", "ar", None)), "عاملة");
        assert_eq!(label(display_status("nonsense", "en", None)), "Unknown");
        assert_eq!(label(translate_status_label("inactive", "en", None)), "inactive");
        assert_eq!(label(translate_status_label("inactive", "ar", None)), "غير عاملة");
    }

    #[test]
    fn status_vocabulary_can_be_replaced() {
        let cfg: JsRegistryConfig = serde_json::from_value(serde_json::json!({
            "statuses": {
                "entries": [
                    { "raw": "open", "status": "operational", "label_en": "Open" }
                ],
                "labels": {
                    "operational": { "en": "Running", "ar": "عاملة" },
                    "partially_operational": { "en": "Partial", "ar": "تعمل جزئياً" },
                    "not_operational": { "en": "Closed", "ar": "غير عاملة" },
                    "unknown": { "en": "Unknown", "ar": "غير معروف" }
                }
            }
        }))
        .expect("config");
        let statuses = RegistryConfig::from(cfg).tables.statuses;

        assert_eq!(statuses.display(FacilityStatus::Operational, Locale::En), "Running");
        assert_eq!(statuses.translate_label("open", Locale::En), "Open");
        assert_eq!(statuses.normalize("open"), FacilityStatus::Operational);
    }
}
