//! Record shape recognition and per-shape field extraction
//!
//! The extraction service answers in one of two known layouts:
//!
//! ```text
//! Flat:        { "numero_poliza": "...", "aseguradora": "...", "prima_total": "..." }
//! Structured:  { "general_info": {...}, "insurer_info": {...},
//!                "financial_info": {...}, "validity": {...} }
//! ```
//!
//! `classify` picks the variant once; each variant has its own pure conversion
//! into [`RawFields`].

use crate::coerce::{self, CoercionWarning};
use chrono::NaiveDate;
use polis_domain::{CoverageLine, VehicleInfo};
use serde_json::{Map, Value};

type Object = Map<String, Value>;

// Field aliases, in lookup priority order
const INSURED: &[&str] = &["insured_name", "insuredName", "insured", "nombre_asegurado", "asegurado", "contratante", "policyholder"];
const INSURER: &[&str] = &["insurer_name", "insurerName", "insurer", "aseguradora", "compania", "company", "carrier"];
const POLICY_NUMBER: &[&str] = &["policy_number", "policyNumber", "numero_poliza", "num_poliza", "no_poliza", "poliza", "policy_no"];
const POLICY_TYPE: &[&str] = &["policy_type", "policyType", "tipo_poliza", "tipo_seguro", "ramo", "type", "category"];
const PREMIUM: &[&str] = &["premium", "total_premium", "totalPremium", "prima_total", "prima", "importe_total"];
const MONTHLY: &[&str] = &["monthly_amount", "monthlyAmount", "installment_amount", "pago_mensual", "monto_mensual", "mensualidad"];
const EFFECTIVE: &[&str] = &["effective_date", "effectiveDate", "start_date", "startDate", "fecha_inicio", "inicio_vigencia", "vigencia_desde"];
const EXPIRATION: &[&str] = &["expiration_date", "expirationDate", "end_date", "endDate", "fecha_fin", "fin_vigencia", "vigencia_hasta", "fecha_vencimiento"];
const INSTALLMENTS: &[&str] = &["installments", "installment_count", "payment_installments", "numero_pagos", "num_pagos", "pagos"];
const DEDUCTIBLE: &[&str] = &["deductible", "deducible"];
const DOCUMENT_NUMBER: &[&str] = &["document_number", "documentNumber", "numero_documento", "folio"];
const DOCUMENT_KIND: &[&str] = &["document_kind", "document_type", "documentType", "tipo_documento"];
const BROKER: &[&str] = &["broker_name", "broker", "agente", "agent", "entity_name", "entidad"];
const VEHICLE_MODEL: &[&str] = &["vehicle_model", "vehicleModel", "marca_modelo", "descripcion_vehiculo"];
const VEHICLE_PLATE: &[&str] = &["vehicle_plate", "plate", "license_plate", "placas", "placa"];
const VEHICLE_YEAR: &[&str] = &["vehicle_year", "vehicleYear", "anio", "año", "modelo_anio"];
const COVERAGES: &[&str] = &["coverages", "coberturas", "coverage_lines"];

// Keys inside a nested vehicle object
const VEHICLE_GROUP: &[&str] = &["vehicle", "vehiculo", "vehicle_info", "datos_vehiculo"];
const GROUP_MODEL: &[&str] = &["model", "descripcion", "description", "marca_modelo", "vehicle_model"];
const GROUP_YEAR: &[&str] = &["year", "anio", "año", "modelo"];

// Structured-shape groups
const GENERAL_GROUP: &[&str] = &["general_info", "generalInfo", "informacion_general", "datos_generales"];
const INSURER_GROUP: &[&str] = &["insurer_info", "insurerInfo", "informacion_aseguradora", "datos_aseguradora", "insurer"];
const FINANCIAL_GROUP: &[&str] = &["financial_info", "financialInfo", "informacion_financiera", "datos_financieros"];
const VALIDITY_GROUP: &[&str] = &["validity", "validity_dates", "validityDates", "vigencia", "fechas"];

// Short names used inside structured groups
const GROUP_NAME: &[&str] = &["name", "nombre"];
const GROUP_START: &[&str] = &["start", "from", "desde", "inicio"];
const GROUP_END: &[&str] = &["end", "to", "until", "hasta", "fin"];

// Key fragments that mark a financial figure in an unrecognized record
const FINANCIAL_HINTS: &[&str] = &["prima", "premium", "total", "monto", "amount", "importe", "pago", "payment"];

// Key fragments of counts that share words with financial keys
const COUNT_HINTS: &[&str] = &["numero", "num_", "count", "pages", "paginas", "cantidad"];

/// Which layout a record was recognized as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// Fields directly on the record
    Flat,
    /// Fields nested under named groups
    Structured,
    /// Neither; only minimal data is kept
    Unrecognized,
}

impl ShapeKind {
    /// Get the shape name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Flat => "flat",
            ShapeKind::Structured => "structured",
            ShapeKind::Unrecognized => "unrecognized",
        }
    }
}

/// Named groups of a structured record
#[derive(Debug, Clone, Copy)]
pub struct StructuredGroups<'a> {
    root: &'a Object,
    general: Option<&'a Object>,
    insurer: Option<&'a Object>,
    financial: Option<&'a Object>,
    validity: Option<&'a Object>,
}

/// A record classified into one of its possible layouts
#[derive(Debug, Clone, Copy)]
pub enum RecordShape<'a> {
    /// Fields directly on the record
    Flat(&'a Object),
    /// Fields nested under named groups
    Structured(StructuredGroups<'a>),
    /// Neither layout matched
    Unrecognized(&'a Object),
}

impl<'a> RecordShape<'a> {
    /// The variant's kind
    pub fn kind(&self) -> ShapeKind {
        match self {
            RecordShape::Flat(_) => ShapeKind::Flat,
            RecordShape::Structured(_) => ShapeKind::Structured,
            RecordShape::Unrecognized(_) => ShapeKind::Unrecognized,
        }
    }

    /// Run the variant's conversion
    pub fn extract(&self, warnings: &mut Vec<CoercionWarning>) -> RawFields {
        match self {
            RecordShape::Flat(obj) => from_flat(obj, warnings),
            RecordShape::Structured(groups) => from_structured(groups, warnings),
            RecordShape::Unrecognized(obj) => from_unrecognized(obj, warnings),
        }
    }
}

/// Classify a record; `None` when it is not a JSON object at all
pub fn classify(value: &Value) -> Option<RecordShape<'_>> {
    let obj = value.as_object()?;

    let identifying = [INSURED, INSURER, POLICY_NUMBER];
    if identifying.iter().any(|aliases| scalar_field(obj, aliases).is_some()) {
        return Some(RecordShape::Flat(obj));
    }

    let groups = StructuredGroups {
        root: obj,
        general: group(obj, GENERAL_GROUP),
        insurer: group(obj, INSURER_GROUP),
        financial: group(obj, FINANCIAL_GROUP),
        validity: group(obj, VALIDITY_GROUP),
    };
    if groups.general.is_some() || groups.insurer.is_some() || groups.financial.is_some() || groups.validity.is_some() {
        return Some(RecordShape::Structured(groups));
    }

    Some(RecordShape::Unrecognized(obj))
}

/// Fields read from a record, before placeholder and validity rules apply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFields {
    pub insured_name: Option<String>,
    pub insurer_name: Option<String>,
    pub policy_number: Option<String>,
    pub policy_type: Option<String>,
    pub premium: Option<f64>,
    pub monthly_amount: Option<f64>,
    pub effective_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub installment_count: Option<u32>,
    pub deductible: Option<f64>,
    pub document_number: Option<String>,
    pub document_kind: Option<String>,
    pub vehicle: VehicleInfo,
    pub broker_name: Option<String>,
    pub coverage_lines: Vec<CoverageLine>,
}

fn from_flat(obj: &Object, warnings: &mut Vec<CoercionWarning>) -> RawFields {
    RawFields {
        insured_name: text_field(obj, INSURED),
        insurer_name: text_field(obj, INSURER),
        policy_number: text_field(obj, POLICY_NUMBER),
        policy_type: text_field(obj, POLICY_TYPE),
        premium: money_field(obj, PREMIUM, "premium", warnings),
        monthly_amount: money_field(obj, MONTHLY, "monthly_amount", warnings),
        effective_date: date_field(obj, EFFECTIVE, "effective_date", warnings),
        expiration_date: date_field(obj, EXPIRATION, "expiration_date", warnings),
        installment_count: count_field(obj, INSTALLMENTS, "installment_count", warnings),
        deductible: money_field(obj, DEDUCTIBLE, "deductible", warnings),
        document_number: text_field(obj, DOCUMENT_NUMBER),
        document_kind: text_field(obj, DOCUMENT_KIND),
        vehicle: vehicle(obj, warnings),
        broker_name: text_field(obj, BROKER),
        coverage_lines: coverage_lines(obj, warnings),
    }
}

fn from_structured(groups: &StructuredGroups<'_>, warnings: &mut Vec<CoercionWarning>) -> RawFields {
    let empty = Object::new();
    let general = groups.general.unwrap_or(&empty);
    let insurer = groups.insurer.unwrap_or(&empty);
    let financial = groups.financial.unwrap_or(&empty);
    let validity = groups.validity.unwrap_or(&empty);

    let coverages = {
        let from_general = coverage_lines(general, warnings);
        if from_general.is_empty() {
            coverage_lines(groups.root, warnings)
        } else {
            from_general
        }
    };

    let vehicle = {
        let nested = self::vehicle(general, warnings);
        if nested.is_empty() {
            self::vehicle(groups.root, warnings)
        } else {
            nested
        }
    };

    RawFields {
        insured_name: text_field(general, INSURED),
        insurer_name: text_field(insurer, GROUP_NAME).or_else(|| text_field(insurer, INSURER)),
        policy_number: text_field(general, POLICY_NUMBER),
        policy_type: text_field(general, POLICY_TYPE),
        premium: money_field(financial, PREMIUM, "premium", warnings),
        monthly_amount: money_field(financial, MONTHLY, "monthly_amount", warnings),
        effective_date: date_field(validity, GROUP_START, "effective_date", warnings)
            .or_else(|| date_field(validity, EFFECTIVE, "effective_date", warnings)),
        expiration_date: date_field(validity, GROUP_END, "expiration_date", warnings)
            .or_else(|| date_field(validity, EXPIRATION, "expiration_date", warnings)),
        installment_count: count_field(financial, INSTALLMENTS, "installment_count", warnings),
        deductible: money_field(financial, DEDUCTIBLE, "deductible", warnings),
        document_number: text_field(general, DOCUMENT_NUMBER),
        document_kind: text_field(general, DOCUMENT_KIND),
        vehicle,
        broker_name: text_field(general, BROKER).or_else(|| text_field(insurer, BROKER)),
        coverage_lines: coverages,
    }
}

fn from_unrecognized(obj: &Object, warnings: &mut Vec<CoercionWarning>) -> RawFields {
    RawFields {
        premium: aliased_figure(obj, PREMIUM, warnings)
            .or_else(|| aliased_figure(obj, MONTHLY, warnings))
            .or_else(|| first_financial_figure(obj, warnings)),
        ..RawFields::default()
    }
}

/// Amount under one of `aliases`, searching nested objects depth-first
fn aliased_figure(obj: &Object, aliases: &[&str], warnings: &mut Vec<CoercionWarning>) -> Option<f64> {
    if let Some(value) = field(obj, aliases) {
        let mut local = Vec::new();
        if let Some(amount) = coerce::money(value, "premium", &mut local) {
            warnings.extend(local);
            return Some(amount);
        }
    }
    obj.values()
        .filter_map(Value::as_object)
        .find_map(|nested| aliased_figure(nested, aliases, warnings))
}

/// Installment counts and page totals are not amounts
fn is_count_key(key: &str) -> bool {
    INSTALLMENTS.iter().any(|alias| key.eq_ignore_ascii_case(alias)) || COUNT_HINTS.iter().any(|hint| key.contains(hint))
}

/// First amount under a key that looks financial, searching nested objects depth-first
fn first_financial_figure(obj: &Object, warnings: &mut Vec<CoercionWarning>) -> Option<f64> {
    for (key, value) in obj {
        let lower = key.to_lowercase();
        if !is_count_key(&lower) && FINANCIAL_HINTS.iter().any(|hint| lower.contains(hint)) {
            let mut local = Vec::new();
            if let Some(amount) = coerce::money(value, "premium", &mut local) {
                warnings.extend(local);
                return Some(amount);
            }
        }
        if let Value::Object(nested) = value {
            if let Some(amount) = first_financial_figure(nested, warnings) {
                return Some(amount);
            }
        }
    }
    None
}

fn vehicle(obj: &Object, warnings: &mut Vec<CoercionWarning>) -> VehicleInfo {
    if let Some(group) = group(obj, VEHICLE_GROUP) {
        let nested = VehicleInfo {
            model: text_field(group, GROUP_MODEL).or_else(|| text_field(group, VEHICLE_MODEL)),
            plate: text_field(group, VEHICLE_PLATE),
            year: field(group, GROUP_YEAR)
                .or_else(|| field(group, VEHICLE_YEAR))
                .and_then(|v| coerce::year(v, "vehicle_year", warnings)),
        };
        if !nested.is_empty() {
            return nested;
        }
    }

    VehicleInfo {
        model: text_field(obj, VEHICLE_MODEL).or_else(|| scalar_field(obj, VEHICLE_GROUP).and_then(coerce::text)),
        plate: text_field(obj, VEHICLE_PLATE),
        year: field(obj, VEHICLE_YEAR).and_then(|v| coerce::year(v, "vehicle_year", warnings)),
    }
}

fn coverage_lines(obj: &Object, warnings: &mut Vec<CoercionWarning>) -> Vec<CoverageLine> {
    let Some(items) = field(obj, COVERAGES).and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(_) => coerce::text(item).map(|d| CoverageLine::new(d, None)),
            Value::Object(entry) => {
                let description = text_field(entry, &["description", "descripcion", "name", "nombre", "coverage", "cobertura"])?;
                let limit = field(entry, &["limit", "limite", "sum_insured", "suma_asegurada", "amount", "monto"])
                    .and_then(|v| coerce::money(v, "coverage_limit", warnings));
                Some(CoverageLine::new(description, limit))
            }
            _ => None,
        })
        .collect()
}

/// Find the first alias present with a non-null, non-blank value
///
/// Exact key matches win; a case-insensitive pass follows.
fn field<'a>(obj: &'a Object, aliases: &[&str]) -> Option<&'a Value> {
    let usable = |v: &&Value| match v {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    };

    aliases
        .iter()
        .find_map(|alias| obj.get(*alias).filter(usable))
        .or_else(|| {
            aliases.iter().find_map(|alias| {
                obj.iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(alias))
                    .map(|(_, v)| v)
                    .filter(usable)
            })
        })
}

fn scalar_field<'a>(obj: &'a Object, aliases: &[&str]) -> Option<&'a Value> {
    field(obj, aliases).filter(|v| matches!(v, Value::String(_) | Value::Number(_)))
}

fn group<'a>(obj: &'a Object, aliases: &[&str]) -> Option<&'a Object> {
    aliases
        .iter()
        .find_map(|alias| obj.get(*alias).and_then(Value::as_object))
}

fn text_field(obj: &Object, aliases: &[&str]) -> Option<String> {
    scalar_field(obj, aliases).and_then(coerce::text)
}

fn money_field(obj: &Object, aliases: &[&str], name: &'static str, warnings: &mut Vec<CoercionWarning>) -> Option<f64> {
    field(obj, aliases).and_then(|v| coerce::money(v, name, warnings))
}

fn date_field(obj: &Object, aliases: &[&str], name: &'static str, warnings: &mut Vec<CoercionWarning>) -> Option<NaiveDate> {
    field(obj, aliases).and_then(|v| coerce::date(v, name, warnings))
}

fn count_field(obj: &Object, aliases: &[&str], name: &'static str, warnings: &mut Vec<CoercionWarning>) -> Option<u32> {
    field(obj, aliases).and_then(|v| coerce::count(v, name, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_flat() {
        let record = json!({"numero_poliza": "A-1", "aseguradora": "GNP"});
        assert_eq!(classify(&record).unwrap().kind(), ShapeKind::Flat);
    }

    #[test]
    fn test_classify_structured() {
        let record = json!({
            "general_info": {"policy_number": "S-1"},
            "insurer_info": {"name": "Qualitas"}
        });
        assert_eq!(classify(&record).unwrap().kind(), ShapeKind::Structured);
    }

    #[test]
    fn test_insurer_object_is_a_group_not_a_flat_field() {
        let record = json!({"insurer": {"name": "AXA"}});
        assert_eq!(classify(&record).unwrap().kind(), ShapeKind::Structured);
    }

    #[test]
    fn test_classify_unrecognized_and_non_objects() {
        assert_eq!(classify(&json!({"foo": "bar"})).unwrap().kind(), ShapeKind::Unrecognized);
        assert!(classify(&json!("text")).is_none());
        assert!(classify(&json!([1, 2])).is_none());
    }

    #[test]
    fn test_flat_conversion() {
        let record = json!({
            "nombre_asegurado": "Maria Lopez",
            "aseguradora": "GNP Seguros",
            "numero_poliza": "GNP-123",
            "tipo_poliza": "Auto",
            "prima_total": 12000,
            "pago_mensual": "1,000.00",
            "fecha_inicio": "2025-01-01",
            "fecha_fin": "2026-01-01",
            "numero_pagos": 12,
            "deducible": "5%",
            "placas": "ABC-123",
            "vehicle_model": "Nissan Versa",
            "anio": 2022,
            "agente": "Seguros Norte",
            "coberturas": ["Robo total", {"descripcion": "RC", "suma_asegurada": 3000000}]
        });
        let mut warnings = Vec::new();
        let raw = classify(&record).unwrap().extract(&mut warnings);

        assert_eq!(raw.insured_name.as_deref(), Some("Maria Lopez"));
        assert_eq!(raw.insurer_name.as_deref(), Some("GNP Seguros"));
        assert_eq!(raw.policy_number.as_deref(), Some("GNP-123"));
        assert_eq!(raw.policy_type.as_deref(), Some("Auto"));
        assert_eq!(raw.premium, Some(12000.0));
        assert_eq!(raw.monthly_amount, Some(1000.0));
        assert_eq!(raw.installment_count, Some(12));
        assert_eq!(raw.deductible, Some(5.0));
        assert_eq!(raw.vehicle.plate.as_deref(), Some("ABC-123"));
        assert_eq!(raw.vehicle.model.as_deref(), Some("Nissan Versa"));
        assert_eq!(raw.vehicle.year, Some(2022));
        assert_eq!(raw.broker_name.as_deref(), Some("Seguros Norte"));
        assert_eq!(raw.coverage_lines.len(), 2);
        assert_eq!(raw.coverage_lines[1].limit, Some(3_000_000.0));
        // "1,000.00" and "5%" were read from text
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_structured_conversion() {
        let record = json!({
            "general_info": {"insured_name": "Juan Perez", "policy_number": "Q-77", "policy_type": "Hogar"},
            "insurer_info": {"name": "Qualitas"},
            "financial_info": {"premium": 6000, "installments": "4"},
            "validity": {"start": "2025-02-01", "end": "2026-02-01"},
            "vehicle": {"model": "Mazda 3", "year": "2020"}
        });
        let mut warnings = Vec::new();
        let raw = classify(&record).unwrap().extract(&mut warnings);

        assert_eq!(raw.insured_name.as_deref(), Some("Juan Perez"));
        assert_eq!(raw.insurer_name.as_deref(), Some("Qualitas"));
        assert_eq!(raw.policy_number.as_deref(), Some("Q-77"));
        assert_eq!(raw.premium, Some(6000.0));
        assert_eq!(raw.installment_count, Some(4));
        assert_eq!(raw.effective_date, NaiveDate::from_ymd_opt(2025, 2, 1));
        assert_eq!(raw.expiration_date, NaiveDate::from_ymd_opt(2026, 2, 1));
        assert_eq!(raw.vehicle.model.as_deref(), Some("Mazda 3"));
        assert_eq!(raw.vehicle.year, Some(2020));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unrecognized_keeps_only_a_financial_figure() {
        let record = json!({"resumen": {"monto_total": "$4,500.00"}, "notas": "ilegible"});
        let mut warnings = Vec::new();
        let raw = classify(&record).unwrap().extract(&mut warnings);

        assert_eq!(raw.premium, Some(4500.0));
        assert_eq!(raw.insured_name, None);
        assert_eq!(raw.policy_number, None);
        assert_eq!(raw.coverage_lines, Vec::new());
    }

    #[test]
    fn test_unrecognized_figure_skips_count_keys() {
        let mut warnings = Vec::new();

        let record = json!({"numero_pagos": 12, "prima": "$5,000.00"});
        let raw = classify(&record).unwrap().extract(&mut warnings);
        assert_eq!(raw.premium, Some(5000.0));

        let record = json!({"detalle": {"pagos": 4, "total_pages": 3, "total_primas": "1,250.00"}});
        let raw = classify(&record).unwrap().extract(&mut warnings);
        assert_eq!(raw.premium, Some(1250.0));

        let record = json!({"numero_pagos": 12, "total_pages": 2});
        let raw = classify(&record).unwrap().extract(&mut warnings);
        assert_eq!(raw.premium, None);
    }

    #[test]
    fn test_blank_and_null_fields_are_absent() {
        let record = json!({"policy_number": "Z-1", "insured_name": "  ", "aseguradora": null});
        let mut warnings = Vec::new();
        let raw = classify(&record).unwrap().extract(&mut warnings);

        assert_eq!(raw.insured_name, None);
        assert_eq!(raw.insurer_name, None);
        assert_eq!(raw.premium, None);
        assert_eq!(raw.effective_date, None);
        assert!(raw.vehicle.is_empty());
    }

    #[test]
    fn test_case_insensitive_keys() {
        let record = json!({"Policy_Number": "C-1", "INSURER": "Mapfre"});
        let mut warnings = Vec::new();
        let raw = classify(&record).unwrap().extract(&mut warnings);
        assert_eq!(raw.policy_number.as_deref(), Some("C-1"));
        assert_eq!(raw.insurer_name.as_deref(), Some("Mapfre"));
    }
}
