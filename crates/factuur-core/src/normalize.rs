//! Mapping of an [`AnalyzeResult`] onto the fixed [`InvoiceRecord`] schema.
//!
//! Each target field probes an ordered list of service field names on the
//! first analyzed document; the first non-empty value wins. The VAT number and
//! the KvK number fall back to a scan of the document's raw text when no field
//! supplied them.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{AnalyzeResult, AnalyzedDocument, InvoiceRecord};

const SUPPLIER_KEYS: &[&str] = &["VendorName", "SupplierName"];
const DATE_KEYS: &[&str] = &["InvoiceDate", "DueDate"];
const AMOUNT_KEYS: &[&str] = &["InvoiceTotal", "AmountDue"];
const TAX_KEYS: &[&str] = &["TotalTax", "TaxAmount"];
const VAT_NUMBER_KEYS: &[&str] = &["VendorTaxId", "VendorVatId", "VatRegistrationNumber"];
// Prebuilt models have no chamber-of-commerce field; the text scan supplies it.
const KVK_KEYS: &[&str] = &[];

/// Dutch VAT id: `NL` + 9 digits + `B` + 2 digits.
static VAT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(NL[0-9]{9}B[0-9]{2})\b").unwrap());

/// `KvK`/`K.v.K.` label, optional `nummer`/`nr`, then an 8-digit number.
static KVK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:kvk|k\.v\.k\.?)(?:[\s-]*(?:nummer|nr\.?))?[\s:]*([0-9]{8})\b").unwrap()
});

/// Build an [`InvoiceRecord`] from an analysis result. `notes` is left empty.
pub fn normalize(result: &AnalyzeResult) -> InvoiceRecord {
    let doc = result.documents.first();

    let mut btw_number = first_non_empty(doc, VAT_NUMBER_KEYS);
    if btw_number.is_empty() {
        btw_number = find_vat_number(&result.content).unwrap_or_default();
    }

    let mut kvk = first_non_empty(doc, KVK_KEYS);
    if kvk.is_empty() {
        kvk = find_kvk(&result.content).unwrap_or_default();
    }

    InvoiceRecord {
        invoice_date: first_non_empty(doc, DATE_KEYS),
        invoice_amount: first_non_empty(doc, AMOUNT_KEYS),
        btw_amount: first_non_empty(doc, TAX_KEYS),
        btw_number,
        kvk,
        supplier: first_non_empty(doc, SUPPLIER_KEYS),
        notes: String::new(),
    }
}

fn first_non_empty(doc: Option<&AnalyzedDocument>, keys: &[&str]) -> String {
    let Some(doc) = doc else {
        return String::new();
    };
    keys.iter()
        .map(|key| doc.field(key).text())
        .find(|text| !text.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// First Dutch VAT id in `text`, upper-cased.
pub fn find_vat_number(text: &str) -> Option<String> {
    VAT_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_uppercase())
}

/// First labelled 8-digit KvK number in `text`.
pub fn find_kvk(text: &str) -> Option<String> {
    KVK_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
