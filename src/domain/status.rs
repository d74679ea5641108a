use crate::domain::transaction::TransactionStatus;

/// How a transaction status is presented in an alert email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusDisplay {
    pub label: &'static str,
    pub color: &'static str,
    pub message: &'static str,
}

impl TransactionStatus {
    pub fn display(self) -> StatusDisplay {
        match self {
            TransactionStatus::Pending => StatusDisplay {
                label: "Pending",
                color: "#f39c12",
                message: "The transaction has been broadcast and is waiting to be included in a block.",
            },
            TransactionStatus::Processing => StatusDisplay {
                label: "Processing",
                color: "#3498db",
                message: "The transaction has been picked up and is being processed by the network.",
            },
            TransactionStatus::Confirmed => StatusDisplay {
                label: "Confirmed",
                color: "#27ae60",
                message: "The transaction has been confirmed on-chain.",
            },
            TransactionStatus::Failed => StatusDisplay {
                label: "Failed",
                color: "#e74c3c",
                message: "The transaction failed. No funds were transferred, but gas may have been spent.",
            },
            TransactionStatus::Unknown => StatusDisplay {
                label: "Unknown",
                color: "#7f8c8d",
                message: "The transaction status could not be determined.",
            },
        }
    }
}
