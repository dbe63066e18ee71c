//! Brazil NFS-e 1.X: municipal service invoices following the ABRASF
//! model.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::cbc::{Code, Definition, Key, Text, compile};
use crate::core::error::FieldErrors;
use crate::core::extensions::ExtRule;
use crate::core::types::*;
use crate::engine::{Document, DocumentMut};
use crate::regimes::brazil::EXT_KEY_MUNICIPALITY;
use crate::tax::AddonDef;

pub const KEY: Key = Key::from_static("br-nfse-v1");

pub const EXT_KEY_CNAE: Key = Key::from_static("br-nfse-cnae");
pub const EXT_KEY_FISCAL_INCENTIVE: Key = Key::from_static("br-nfse-fiscal-incentive");
pub const EXT_KEY_ISS_LIABILITY: Key = Key::from_static("br-nfse-iss-liability");
pub const EXT_KEY_SERVICE: Key = Key::from_static("br-nfse-service");
pub const EXT_KEY_SIMPLES: Key = Key::from_static("br-nfse-simples");
pub const EXT_KEY_SPECIAL_REGIME: Key = Key::from_static("br-nfse-special-regime");
/// Replaced by the regime's IBGE municipality extension.
pub const EXT_KEY_LEGACY_MUNICIPALITY: Key = Key::from_static("br-nfse-municipality");

const FISCAL_INCENTIVE_DEFAULT: &str = "2";

static INVOICE_CODE: LazyLock<Regex> = LazyLock::new(|| compile(r"^[1-9]\d*$"));

const ABRASF_TITLE: &str = "NFS-e ABRASF Taxpayer Guidance Manual (v2.04)";
const ABRASF_URL: &str = "https://abrasf.org.br/biblioteca/arquivos-publicos/nfs-e-manual-de-orientacao-do-contribuinte-2-04/download";

pub fn new() -> AddonDef {
    AddonDef {
        key: KEY,
        name: Text::en("Brazil NFS-e 1.X"),
        description: Some(Text::en(
            "Extensions to support the Brazilian NFS-e (Nota Fiscal de Serviços Eletrônica) \
             format for service invoices.",
        )),
        extensions: extensions(),
        ext_migrations: vec![(EXT_KEY_LEGACY_MUNICIPALITY, EXT_KEY_MUNICIPALITY)],
        validator: Some(validate),
        normalizer: Some(normalize),
        ..Default::default()
    }
}

fn extensions() -> Vec<Definition> {
    let code = |c: &'static str, name: &'static str| Definition::with_code(Code::from_static(c), name);
    vec![
        Definition::with_key(EXT_KEY_CNAE, "CNAE code")
            .desc("National Classification of Economic Activities code of the service.")
            .pattern(r"^\d{2}[\s\.\-/]?\d{2}[\s\.\-/]?\d[\s\.\-/]?\d{2}$"),
        Definition::with_key(EXT_KEY_FISCAL_INCENTIVE, "Fiscal Incentive")
            .values(vec![code("1", "Has incentive"), code("2", "Does not have incentive")])
            .source(ABRASF_TITLE, ABRASF_URL),
        Definition::with_key(EXT_KEY_ISS_LIABILITY, "ISS Liability")
            .desc("Whether the ISS tax is due, and why not when it isn't.")
            .values(vec![
                code("1", "Liable"),
                code("2", "Not subject"),
                code("3", "Exempt"),
                code("4", "Export"),
                code("5", "Immune"),
                code("6", "Suspended Judicially"),
                code("7", "Suspended Administratively"),
            ])
            .source(ABRASF_TITLE, ABRASF_URL),
        Definition::with_key(EXT_KEY_SERVICE, "Service Code").desc(
            "Service code as defined by the municipality, usually one of the codes of \
             Lei Complementar 116/2003.",
        ),
        Definition::with_key(EXT_KEY_SIMPLES, "Opting for \"Simples Nacional\" regime")
            .values(vec![code("1", "Opt-in"), code("2", "Opt-out")])
            .source(ABRASF_TITLE, ABRASF_URL),
        Definition::with_key(EXT_KEY_SPECIAL_REGIME, "Special Tax Regime")
            .values(vec![
                code("1", "Municipal micro-enterprise"),
                code("2", "Estimated"),
                code("3", "Professional Society"),
                code("4", "Cooperative"),
                code("5", "Single micro-entrepreneur (MEI)"),
                code("6", "Micro-enterprise or Small Business (ME EPP)"),
            ])
            .source(ABRASF_TITLE, ABRASF_URL),
    ]
}

fn normalize(doc: DocumentMut<'_>) {
    if let DocumentMut::Invoice(inv) = doc {
        if !inv.supplier.ext.has(&[EXT_KEY_FISCAL_INCENTIVE]) {
            inv.supplier
                .ext
                .set(EXT_KEY_FISCAL_INCENTIVE, FISCAL_INCENTIVE_DEFAULT);
        }
    }
}

fn validate(doc: Document<'_>) -> FieldErrors {
    match doc {
        Document::Invoice(inv) => validate_invoice(inv),
        Document::Item(item) => {
            let mut errs = FieldErrors::new();
            errs.nest("ext", ExtRule::require(&[EXT_KEY_SERVICE]).check(&item.ext));
            errs
        }
        _ => FieldErrors::new(),
    }
}

fn validate_invoice(inv: &Invoice) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if inv.series.as_ref().is_none_or(|s| s.is_empty()) {
        errs.add("series", "cannot be blank");
    }
    if let Some(code) = inv.code.as_ref().filter(|c| !c.is_empty()) {
        if !INVOICE_CODE.is_match(code.as_str()) {
            errs.add("code", "must be in a valid format");
        }
    }
    if !inv.charges.is_empty() {
        errs.add("charges", "not supported by nfse");
    }
    if !inv.discounts.is_empty() {
        errs.add("discounts", "not supported by nfse");
    }
    errs.nest("supplier", validate_supplier(&inv.supplier));
    errs
}

fn validate_supplier(party: &Party) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if party.name.trim().is_empty() {
        errs.add("name", "cannot be blank");
    }
    if party.addresses.is_empty() {
        errs.add("addresses", "cannot be blank");
    }
    let mut addresses = FieldErrors::new();
    for (i, addr) in party.addresses.iter().enumerate() {
        addresses.nest(i.to_string(), validate_address(addr));
    }
    errs.nest("addresses", addresses);
    errs.nest(
        "ext",
        ExtRule::require(&[EXT_KEY_SIMPLES, EXT_KEY_MUNICIPALITY, EXT_KEY_FISCAL_INCENTIVE])
            .check(&party.ext),
    );
    errs
}

fn validate_address(addr: &Address) -> FieldErrors {
    let mut errs = FieldErrors::new();
    let blank = |s: &Option<String>| s.as_deref().is_none_or(|s| s.trim().is_empty());
    if blank(&addr.street) {
        errs.add("street", "cannot be blank");
    }
    if blank(&addr.locality) {
        errs.add("locality", "cannot be blank");
    }
    if blank(&addr.region) {
        errs.add("region", "cannot be blank");
    }
    if addr.code.as_ref().is_none_or(|c| c.is_empty()) {
        errs.add("code", "cannot be blank");
    }
    errs
}
