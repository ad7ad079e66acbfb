use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::io::Write;

use super::ProposalView;

const MISSING: &str = "N/A";

/// Something that can present one proposal.
pub trait Render {
    fn render(&mut self, view: &ProposalView) -> Result<()>;
}

/// `R$ 1,234,567.89`; absent values render as `N/A`.
pub fn format_currency(value: Option<f64>) -> String {
    let Some(v) = value else {
        return MISSING.to_string();
    };
    let fixed = format!("{:.2}", v.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let negative = v < 0.0 && fixed.chars().any(|c| c != '0' && c != '.');
    format!(
        "R$ {}{}.{}",
        if negative { "-" } else { "" },
        grouped,
        frac_part
    )
}

/// `dd/mm/YYYY`, or `N/A`.
pub fn format_date(value: Option<NaiveDateTime>) -> String {
    value
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

fn or_missing(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(MISSING)
}

impl ProposalView {
    /// Headline figures, paired with their display labels, in display order.
    pub fn metrics(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Investimento Total", format_currency(self.total)),
            ("Investimento Requerido", format_currency(self.required_investment)),
            ("Tipo de projeto", or_missing(&self.project_type).to_string()),
            (
                "Identificação do benefício",
                or_missing(&self.identification).to_string(),
            ),
            ("Categoria", or_missing(&self.category).to_string()),
            ("Status", or_missing(&self.status).to_string()),
            ("Data de inscrição", format_date(self.created_at)),
            ("Data de Finalização", format_date(self.completed_at)),
        ]
    }
}

/// Plain labelled text.
pub struct TextRenderer<W: Write> {
    out: W,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Render for TextRenderer<W> {
    fn render(&mut self, view: &ProposalView) -> Result<()> {
        let out = &mut self.out;
        writeln!(out, "=== {} ===", or_missing(&view.name))?;
        writeln!(out)?;
        writeln!(out, "Descrição do Projeto")?;
        writeln!(out, "{}", or_missing(&view.description_project))?;
        writeln!(out)?;
        writeln!(out, "Descrição do benefício")?;
        writeln!(out, "{}", or_missing(&view.description_benefit))?;
        writeln!(out)?;

        let metrics = view.metrics();
        let width = metrics.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);
        for (label, value) in &metrics {
            let pad = width - label.chars().count();
            writeln!(out, "{}:{} {}", label, " ".repeat(pad), value)?;
        }
        writeln!(out)?;

        writeln!(out, "Informações da Empresa")?;
        writeln!(out, "Nome da Empresa: {}", or_missing(&view.company_name))?;
        writeln!(out, "Cidade: {}", or_missing(&view.city_id))?;
        writeln!(out, "CNPJ: {}", or_missing(&view.federal_tax_id))?;
        out.flush().context("flushing rendered proposal")?;
        Ok(())
    }
}

/// One pretty-printed JSON object per proposal.
pub struct JsonRenderer<W: Write> {
    out: W,
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Render for JsonRenderer<W> {
    fn render(&mut self, view: &ProposalView) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.out, view).context("serializing proposal")?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}
