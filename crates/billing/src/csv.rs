//! Hand-rolled CSV rendering for `export(tenant)`.
//!
//! No CSV crate appears anywhere in the retrieved ecosystem sample for
//! this workspace, so this mirrors the fixed five-column schema by hand;
//! the only escaping needed is quoting fields that contain a comma,
//! quote, or newline.

use crate::ExportSummaryRow;

const HEADER: &str = "date,model,input_tokens,output_tokens,cost_usd,task_id";

pub fn export_csv(rows: &[ExportSummaryRow]) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for row in rows {
        out.push_str(&quote(&row.date));
        out.push(',');
        out.push_str(&quote(&row.model.to_string()));
        out.push(',');
        out.push_str(&row.input_tokens.to_string());
        out.push(',');
        out.push_str(&row.output_tokens.to_string());
        out.push(',');
        out.push_str(&format!("{:.6}", row.cost_usd));
        out.push(',');
        out.push_str(&quote(&row.task_id));
        out.push('\n');
    }
    out
}

fn quote(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_core::LlmModel;

    #[test]
    fn renders_header_and_rows() {
        let rows = vec![ExportSummaryRow {
            date: "2026-07-27".to_string(),
            model: LlmModel::Claude,
            input_tokens: 1000,
            output_tokens: 500,
            cost_usd: 0.0105,
            task_id: "job-1".to_string(),
        }];
        let csv = export_csv(&rows);
        assert_eq!(
            csv,
            "date,model,input_tokens,output_tokens,cost_usd,task_id\n2026-07-27,claude,1000,500,0.010500,job-1\n"
        );
    }

    #[test]
    fn quotes_fields_containing_commas() {
        let quoted = quote("a,b");
        assert_eq!(quoted, "\"a,b\"");
    }
}
