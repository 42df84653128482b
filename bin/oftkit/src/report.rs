//! Terminal tables for run results and recorded deployments.

use comfy_table::{Table, presets::UTF8_FULL};
use oftkit_deploy::{DeploymentOutcome, DeploymentRecord, UnitReport};

pub fn units_table(reports: &[UnitReport]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Unit", "Contract", "Phase", "Result"]);

    for report in reports {
        let result = match &report.outcome {
            DeploymentOutcome::Success(record) => record.address.to_string(),
            DeploymentOutcome::Skipped(reason) => reason.clone(),
            DeploymentOutcome::Failed(error) => error.to_string(),
        };
        table.add_row(vec![
            report.unit.to_string(),
            report.unit.contract_name().to_string(),
            report.phase.to_string(),
            result,
        ]);
    }

    table
}

pub fn records_table(records: &[DeploymentRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Contract", "Address", "Transaction"]);

    for record in records {
        table.add_row(vec![
            record.contract_name.clone(),
            record.address.to_string(),
            record
                .transaction_hash
                .map(|hash| hash.to_string())
                .unwrap_or_else(|| "external".to_string()),
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::{Address, B256};
    use oftkit_deploy::{DeploymentPhase, UnitKind};

    use super::*;

    #[test]
    fn test_units_table() {
        let reports = vec![
            UnitReport {
                unit: UnitKind::ElevatedMinterBurner,
                network: "mainnet".to_string(),
                phase: DeploymentPhase::Skipped,
                outcome: DeploymentOutcome::Skipped("elevatedMinterBurner not configured".to_string()),
            },
            UnitReport {
                unit: UnitKind::OftAdapter,
                network: "mainnet".to_string(),
                phase: DeploymentPhase::Succeeded,
                outcome: DeploymentOutcome::Success(DeploymentRecord {
                    contract_name: "MyOFTAdapter".to_string(),
                    network: "mainnet".to_string(),
                    address: Address::repeat_byte(0x12),
                    constructor_args: vec![],
                    transaction_hash: Some(B256::repeat_byte(0xab)),
                }),
            },
        ];

        let rendered = units_table(&reports).to_string();
        assert!(rendered.contains("elevatedMinterBurner not configured"));
        assert!(rendered.contains("MyOFTAdapter"));
        assert!(rendered.contains("succeeded"));
    }

    #[test]
    fn test_records_table_marks_external_records() {
        let records = vec![DeploymentRecord {
            contract_name: "EndpointV2".to_string(),
            network: "mainnet".to_string(),
            address: Address::repeat_byte(0x1a),
            constructor_args: vec![],
            transaction_hash: None,
        }];

        let rendered = records_table(&records).to_string();
        assert!(rendered.contains("EndpointV2"));
        assert!(rendered.contains("external"));
    }
}
