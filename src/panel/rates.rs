// src/panel/rates.rs

use tracing::{info, instrument};

use crate::error::PanelError;
use crate::panel::table::{Column, ColumnType, Panel};
use crate::process::utils::round_to;
use crate::schema::types::MORTALITY_COLUMNS;

/// Deaths per 1000 live births, two decimals. Zero births gives exactly 0.
pub fn mortality_rate(count: f64, births: f64) -> f64 {
    if births == 0.0 {
        return 0.0;
    }
    round_to(count / births * 1000.0, 2)
}

/// Nominal spending expressed in terminal-period prices, two decimals.
pub fn deflate(pc_spend: Option<f64>, index: Option<f64>) -> Option<f64> {
    match (pc_spend, index) {
        (Some(spend), Some(index)) if index != 0.0 => Some(round_to(spend / index, 2)),
        _ => None,
    }
}

pub fn rate_column(indicator: &str) -> String {
    format!("{}_rate", indicator)
}

/// Append `<indicator>_rate` for every mortality indicator, in column order.
pub fn add_mortality_rates(panel: &mut Panel) -> Result<(), PanelError> {
    let births = panel.values("births")?.to_vec();
    for indicator in MORTALITY_COLUMNS {
        let rates = panel
            .values(indicator)?
            .iter()
            .zip(&births)
            .map(|(count, births)| match (count, births) {
                (Some(c), Some(b)) => Some(mortality_rate(*c, *b)),
                _ => None,
            })
            .collect();
        panel.push_column(Column::new(rate_column(indicator), ColumnType::Float, rates))?;
    }
    Ok(())
}

/// Append `pc_spend_real`; nominal `pc_spend` is left untouched.
pub fn add_real_spending(panel: &mut Panel) -> Result<(), PanelError> {
    let real: Vec<Option<f64>> = panel
        .values("pc_spend")?
        .iter()
        .zip(panel.values("index")?)
        .map(|(spend, index)| deflate(*spend, *index))
        .collect();
    panel.push_column(Column::new("pc_spend_real", ColumnType::Float, real))
}

#[instrument(level = "info", skip_all, fields(rows = panel.len()))]
pub fn derive_all(panel: &mut Panel) -> Result<(), PanelError> {
    add_mortality_rates(panel)?;
    add_real_spending(panel)?;
    let zero_birth_rows = panel
        .values("births")?
        .iter()
        .filter(|b| **b == Some(0.0))
        .count();
    info!(zero_birth_rows, "derived rates and real spending");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::table::tests::municipality;

    #[test]
    fn rate_rounding_and_zero_births() {
        assert_eq!(mortality_rate(5.0, 100.0), 50.0);
        assert_eq!(mortality_rate(1.0, 3.0), 333.33);
        assert_eq!(mortality_rate(7.0, 0.0), 0.0);
        assert_eq!(mortality_rate(0.0, 0.0), 0.0);
    }

    #[test]
    fn exact_ties_round_to_even() {
        assert_eq!(mortality_rate(1.0, 1600.0), 0.62);
        assert_eq!(mortality_rate(5.0, 1600.0), 3.12);
        assert_eq!(mortality_rate(1.0, 8000.0), 0.12);
        assert_eq!(mortality_rate(3.0, 8000.0), 0.38);
        assert_eq!(deflate(Some(0.625), Some(1.0)), Some(0.62));
    }

    #[test]
    fn deflation_needs_both_inputs() {
        assert_eq!(deflate(Some(105.0), Some(1.0 / 1.05)), Some(110.25));
        assert_eq!(deflate(Some(100.0), Some(1.0)), Some(100.0));
        assert_eq!(deflate(None, Some(1.0)), None);
        assert_eq!(deflate(Some(100.0), None), None);
    }

    #[test]
    fn derived_columns_follow_inputs() -> Result<(), PanelError> {
        let mut panel = Panel::balanced(vec![municipality(110001, "RO", "11")], 2018, 2019)?;
        for (i, name) in MORTALITY_COLUMNS.iter().enumerate() {
            let cells = if i == 0 { vec![Some(5.0), Some(3.0)] } else { vec![Some(0.0); 2] };
            panel.push_column(Column::new(*name, ColumnType::Int, cells))?;
        }
        panel.push_column(Column::new("births", ColumnType::Int, vec![Some(100.0), Some(0.0)]))?;
        panel.push_column(Column::new("pc_spend", ColumnType::Float, vec![Some(200.0), None]))?;
        panel.push_column(Column::new("index", ColumnType::Float, vec![Some(0.5), Some(1.0)]))?;

        derive_all(&mut panel)?;

        assert_eq!(panel.values("im_rate")?, &[Some(50.0), Some(0.0)]);
        assert_eq!(panel.values("im_napc_rate")?, &[Some(0.0), Some(0.0)]);
        assert_eq!(panel.values("pc_spend_real")?, &[Some(400.0), None]);
        assert_eq!(panel.values("pc_spend")?, &[Some(200.0), None]);
        for v in panel.columns().iter().flat_map(|c| c.values.iter().flatten()) {
            assert!(v.is_finite());
        }
        Ok(())
    }
}
