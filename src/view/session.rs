use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use std::io::Write;
use tracing::debug;

use super::{
    render::Render,
    select::{choose, LineSource},
    Dataset,
};
use crate::table::normalize_key;

/// Choices fixed up front; anything left `None` is asked for interactively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub year: Option<i32>,
    pub day: Option<NaiveDate>,
    pub proposal: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Rendered(String),
    NoData,
    NoDays(i32),
    NoProposals(NaiveDate),
    NotFound(String),
    Cancelled,
}

/// Walk year → day → proposal, then render the chosen proposal.
///
/// Prompts and notices go to `ui`; the proposal itself goes to `renderer`.
pub fn run_session<L, W, V>(
    dataset: &Dataset,
    selection: &Selection,
    input: &mut L,
    ui: &mut W,
    renderer: &mut V,
) -> Result<SessionOutcome>
where
    L: LineSource + ?Sized,
    W: Write,
    V: Render + ?Sized,
{
    if dataset.is_empty() {
        writeln!(ui, "Não foi possível carregar os dados para exibição.")?;
        return Ok(SessionOutcome::NoData);
    }

    // a bare proposal id skips the date filters
    if let (None, None, Some(id)) = (selection.year, selection.day, &selection.proposal) {
        return show(dataset, id, ui, renderer);
    }

    // a fixed day implies its year
    let year = match (selection.year, selection.day) {
        (Some(y), _) => y,
        (None, Some(d)) => d.year(),
        (None, None) => {
            let years = dataset.years();
            let labels: Vec<String> = years.iter().map(|y| y.to_string()).collect();
            match choose("Selecione o Ano da Inscrição:", &labels, input, ui)? {
                Some(i) => years[i],
                None => return Ok(SessionOutcome::Cancelled),
            }
        }
    };
    debug!(year, "year selected");

    let days = dataset.days_in_year(year);
    if days.is_empty() {
        writeln!(ui, "Não há dados de inscrição para o ano {}.", year)?;
        return Ok(SessionOutcome::NoDays(year));
    }

    let day = match selection.day {
        Some(d) if days.contains(&d) => d,
        Some(d) => {
            writeln!(ui, "Nenhum projeto encontrado para a data selecionada.")?;
            return Ok(SessionOutcome::NoProposals(d));
        }
        None => {
            let labels: Vec<String> = days
                .iter()
                .map(|d| d.format("%d/%m/%Y").to_string())
                .collect();
            match choose("Selecione o Dia da Inscrição:", &labels, input, ui)? {
                Some(i) => days[i],
                None => return Ok(SessionOutcome::Cancelled),
            }
        }
    };
    debug!(%day, "day selected");

    let proposals = dataset.proposals_on(day);
    if proposals.is_empty() {
        writeln!(ui, "Nenhum projeto encontrado para a data selecionada.")?;
        return Ok(SessionOutcome::NoProposals(day));
    }

    let id = match &selection.proposal {
        Some(id) => {
            let wanted = normalize_key(id);
            match proposals.iter().find(|p| normalize_key(p) == wanted) {
                Some(p) => p.clone(),
                None => {
                    writeln!(ui, "Projeto {} não encontrado para a data selecionada.", id)?;
                    return Ok(SessionOutcome::NotFound(id.clone()));
                }
            }
        }
        None => match choose(
            "Selecione um projeto (filtrado por data):",
            &proposals,
            input,
            ui,
        )? {
            Some(i) => proposals[i].clone(),
            None => return Ok(SessionOutcome::Cancelled),
        },
    };

    show(dataset, &id, ui, renderer)
}

fn show<W, V>(dataset: &Dataset, id: &str, ui: &mut W, renderer: &mut V) -> Result<SessionOutcome>
where
    W: Write,
    V: Render + ?Sized,
{
    match dataset.proposal(id) {
        Some(view) => {
            renderer.render(&view)?;
            Ok(SessionOutcome::Rendered(view.proposal_id))
        }
        None => {
            writeln!(ui, "Projeto {} não encontrado.", id)?;
            Ok(SessionOutcome::NotFound(id.to_string()))
        }
    }
}
