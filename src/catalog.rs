//! Certificate checklist: the ordered slots every company must fill each cycle.
//!
//! Catalog order is the page order of every dossier. Changing the list bumps
//! `CATALOG_VERSION` and only affects dossiers assembled afterwards.

use std::collections::HashSet;

use crate::db::DatabaseError;
use crate::models::{CertificateCategory, CopyValue, SlotDefinition};

pub const CATALOG_VERSION: u32 = 1;

/// Ordered, validated list of slot definitions.
#[derive(Debug, Clone)]
pub struct SlotCatalog {
    version: u32,
    slots: Vec<SlotDefinition>,
}

impl SlotCatalog {
    /// Build a catalog. Slots must be non-empty with unique ids.
    pub fn new(version: u32, slots: Vec<SlotDefinition>) -> Result<Self, DatabaseError> {
        if slots.is_empty() {
            return Err(DatabaseError::InvalidInput("slot catalog is empty".into()));
        }
        let mut seen = HashSet::new();
        for slot in &slots {
            if !seen.insert(slot.id.as_str()) {
                return Err(DatabaseError::InvalidInput(format!(
                    "duplicate slot id '{}'",
                    slot.id
                )));
            }
        }
        Ok(Self { version, slots })
    }

    /// The standard checklist of clearance certificates.
    pub fn standard() -> Self {
        Self {
            version: CATALOG_VERSION,
            slots: standard_slots(),
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn slots(&self) -> &[SlotDefinition] {
        &self.slots
    }

    pub fn iter(&self) -> impl Iterator<Item = &SlotDefinition> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&SlotDefinition> {
        self.slots.iter().find(|s| s.id == id)
    }

    /// Zero-based position in canonical order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.id == id)
    }
}

fn standard_slots() -> Vec<SlotDefinition> {
    use CertificateCategory::*;

    vec![
        SlotDefinition::new(
            "situacao-cadastral-cnpj",
            "Situação Cadastral CNPJ",
            Federal,
            "https://solucoes.receita.fazenda.gov.br/Servicos/cnpjreva/cnpjreva_solicitacao.asp",
        ),
        SlotDefinition::new(
            "crf-fgts",
            "CRF do FGTS",
            Federal,
            "https://consulta-crf.caixa.gov.br/consultacrf/pages/consultaEmpregador.jsf",
        ),
        SlotDefinition::new(
            "cnd-estadual-sp",
            "CND Estadual SP (ICMS/IPVA)",
            Estadual,
            "https://www10.fazenda.sp.gov.br/CertidaoNegativaDeb/Pages/EmissaoCertidaoNegativa.aspx",
        ),
        SlotDefinition::new(
            "certidao-conjunta-federal",
            "Certidão Conjunta Federal",
            Federal,
            "https://servicos.receitafederal.gov.br/servico/certidoes/#/home/cnpj",
        ),
        SlotDefinition::new(
            "cndt-trabalhista",
            "CNDT (Trabalhista)",
            Trabalhista,
            "https://cndt-certidao.tst.jus.br/inicio.faces",
        ),
        SlotDefinition::new(
            "cadin-estadual-sp",
            "CADIN Estadual SP",
            Estadual,
            "https://www.fazenda.sp.gov.br/cadin_estadual/pages/publ/cadin.aspx",
        ),
        SlotDefinition::new(
            "improbidade-administrativa",
            "Improbidade Administrativa (CNJ)",
            Judicial,
            "https://www.cnj.jus.br/improbidade_adm/consultar_requerido.php",
        ),
        SlotDefinition::new(
            "divida-ativa-estadual-sp",
            "Dívida Ativa Estadual SP",
            Estadual,
            "https://www.dividaativa.pge.sp.gov.br/sc/pages/crda/emitirCrda.jsf",
        )
        .with_copy(CopyValue::CnpjBase),
        SlotDefinition::new(
            "cadin-municipal-sp",
            "CADIN Municipal SP",
            Municipal,
            "https://www3.prefeitura.sp.gov.br/cadin/Pesq_Deb.aspx",
        ),
        SlotDefinition::new(
            "falencia-concordata-tjsp",
            "Certidão de Falência/Concordata (TJSP)",
            Judicial,
            "https://esaj.tjsp.jus.br/sco/abrirCadastro.do",
        )
        .with_copy(CopyValue::LegalName)
        .with_note("Selecione \"Jurídica\" e o modelo de Falências."),
        SlotDefinition::new(
            "cadesp",
            "CADESP (Situação Cadastral)",
            Estadual,
            "https://www.cadesp.fazenda.sp.gov.br/Pages/Cadastro/Consultas/ConsultaPublica/ConsultaPublica.aspx",
        ),
        SlotDefinition::new(
            "tributos-mobiliarios-duc",
            "Certidão de Tributos Mobiliários (DUC)",
            Municipal,
            "https://duc.prefeitura.sp.gov.br/certidoes/forms_anonimo/frmConsultaEmissaoCertificado.aspx",
        ),
        SlotDefinition::new(
            "ficha-dados-ccm",
            "Ficha de Dados Cadastrais (CCM)",
            Municipal,
            "https://ccm.prefeitura.sp.gov.br/login/contribuinte?tipo=F",
        ),
    ]
}
