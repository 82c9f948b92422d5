//! Backend identifiers.

use derive_more::Display;

use crate::Error;

/// One of the managed services a job can be submitted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum BackendKind {
    /// EMR Serverless, addressed by application id.
    #[display("emr_serverless")]
    Serverless,
    /// EMR on EC2, addressed by cluster id.
    #[display("emr_ec2")]
    Cluster,
    /// EMR on EKS, addressed by virtual cluster id.
    #[display("emr_eks")]
    Containers,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [
        BackendKind::Serverless,
        BackendKind::Cluster,
        BackendKind::Containers,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            BackendKind::Serverless => "emr_serverless",
            BackendKind::Cluster => "emr_ec2",
            BackendKind::Containers => "emr_eks",
        }
    }

    /// Human-readable service name used in log lines.
    pub fn service_name(&self) -> &'static str {
        match self {
            BackendKind::Serverless => "EMR Serverless",
            BackendKind::Cluster => "EMR on EC2",
            BackendKind::Containers => "EMR on EKS",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendKind::ALL
            .into_iter()
            .find(|b| b.id() == s)
            .ok_or_else(|| Error::UnsupportedBackend(s.to_string()))
    }
}
