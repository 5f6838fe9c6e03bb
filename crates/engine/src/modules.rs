//! The target modules a transaction can pay toward.

use serde::{Deserialize, Serialize};

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Module {
    LoanLedger,
    Targets,
    NpsInvestments,
    GoldInvestments,
    RdFdDeposits,
    ProjectExpense,
    ManageFinance,
    BillDates,
    ChequeRegister,
    DailyCash,
}

impl Module {
    pub const ALL: [Module; 10] = [
        Module::LoanLedger,
        Module::Targets,
        Module::NpsInvestments,
        Module::GoldInvestments,
        Module::RdFdDeposits,
        Module::ProjectExpense,
        Module::ManageFinance,
        Module::BillDates,
        Module::ChequeRegister,
        Module::DailyCash,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Module::LoanLedger => "loan-ledger",
            Module::Targets => "targets",
            Module::NpsInvestments => "nps-investments",
            Module::GoldInvestments => "gold-investments",
            Module::RdFdDeposits => "rd-fd-deposits",
            Module::ProjectExpense => "project-expense",
            Module::ManageFinance => "manage-finance",
            Module::BillDates => "bill-dates",
            Module::ChequeRegister => "cheque-register",
            Module::DailyCash => "daily-cash",
        }
    }

    /// Canonical form of a module name as typed by clients.
    pub fn normalize_name(name: &str) -> String {
        name.trim().to_ascii_lowercase()
    }
}

impl core::fmt::Display for Module {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Module {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let name = Module::normalize_name(value);
        Module::ALL
            .into_iter()
            .find(|m| m.as_str() == name)
            .ok_or_else(|| EngineError::InvalidModule(format!("unknown module: {name}")))
    }
}
