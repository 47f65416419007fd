//! The analysis requests and the stage graphs built for them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::error::PipelineError;
use super::report::{DUEL_HEADING, SECURITY_HEADING, WALLET_PROFILE_HEADING};
use super::stage::{OutputPolicy, PromptTemplate, Stage, StageMode};

/// What a job asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisRequest {
    Single { address: String },
    Duel { first: String, second: String },
}

impl AnalysisRequest {
    pub fn single(address: impl Into<String>) -> Self {
        Self::Single {
            address: address.into(),
        }
    }

    pub fn duel(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self::Duel {
            first: first.into(),
            second: second.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Single { .. } => "single",
            Self::Duel { .. } => "duel",
        }
    }

    pub fn addresses(&self) -> Vec<&str> {
        match self {
            Self::Single { address } => vec![address.as_str()],
            Self::Duel { first, second } => vec![first.as_str(), second.as_str()],
        }
    }

    /// The stage graph for this request.
    pub fn plan(&self) -> Result<StagePlan, PipelineError> {
        match self {
            Self::Single { .. } => single_wallet_plan(),
            Self::Duel { .. } => duel_plan(),
        }
    }
}

/// Ordered stages. Every dependency names an earlier stage.
#[derive(Debug, Clone)]
pub struct StagePlan {
    stages: Vec<Stage>,
}

impl StagePlan {
    pub fn new(stages: Vec<Stage>) -> Result<Self, PipelineError> {
        if stages.is_empty() {
            return Err(PipelineError::InvalidPlan("plan has no stages".to_string()));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for stage in &stages {
            for dependency in &stage.depends_on {
                if !seen.contains(dependency) {
                    let reason = if stages.iter().any(|s| s.name == *dependency) {
                        "is scheduled after it"
                    } else {
                        "does not exist"
                    };
                    return Err(PipelineError::InvalidPlan(format!(
                        "stage '{}' depends on '{}', which {}",
                        stage.name, dependency, reason
                    )));
                }
            }
            if let OutputPolicy::AfterDependency { dependency, .. } = &stage.output {
                if !stage.depends_on.contains(dependency) {
                    return Err(PipelineError::InvalidPlan(format!(
                        "stage '{}' places its output after '{}' without depending on it",
                        stage.name, dependency
                    )));
                }
            }
            if !seen.insert(stage.name) {
                return Err(PipelineError::InvalidPlan(format!(
                    "duplicate stage '{}'",
                    stage.name
                )));
            }
        }

        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// First placeholder, in stage order, that `is_defined` rejects.
    pub fn undefined_placeholder(
        &self,
        is_defined: impl Fn(&str) -> bool,
    ) -> Option<(&'static str, String)> {
        self.stages.iter().find_map(|stage| {
            stage
                .task
                .placeholders()
                .into_iter()
                .find(|name| !is_defined(name))
                .map(|name| (stage.name, name))
        })
    }
}

/// Collector, Analyst and Security Reviewer for one wallet.
///
/// Variables: `wallet_address`, `wallet_data`.
pub fn single_wallet_plan() -> Result<StagePlan, PipelineError> {
    let collector = Stage {
        name: "collector",
        role: "Cardano On-Chain Data Collector",
        goal: "Use the provided data string for the wallet under analysis.",
        backstory: "You are a data handler. Your only job is to receive raw on-chain data \
                    and pass it to the other agents.",
        task: PromptTemplate::new(
            "This is the raw on-chain data for wallet {wallet_address}:\n\n{wallet_data}",
        ),
        expected_output: "A confirmation that the data has been processed and is ready for analysis.",
        depends_on: vec![],
        mode: StageMode::Confirm,
        output: OutputPolicy::Verbatim,
    };

    let analyst = Stage {
        name: "analyst",
        role: "Expert Crypto Wallet Analyst",
        goal: "Analyze collected on-chain data to create a clear, bullet-point summary of the \
               wallet's profile.",
        backstory: "You are a succinct on-chain analyst who turns raw data into simple insights \
                    for non-technical users.",
        task: PromptTemplate::new(
            "You are an on-chain analyst. Analyze the provided JSON data. Create a brief, \
             bullet-point summary under the heading '### Wallet Profile'.\n\n{wallet_data}\n\n\
             Answer:\n\
             - **Primary Activity:** Transactions or collecting assets?\n\
             - **Asset Diversity:** Comment on the number of different assets held.\n\
             - **Wallet Persona:** In one short sentence, what is this wallet's likely persona?",
        ),
        expected_output: "A concise, Markdown-formatted, bullet-point summary under the heading \
                          '### Wallet Profile'.",
        depends_on: vec![],
        mode: StageMode::Infer,
        output: OutputPolicy::Section {
            heading: WALLET_PROFILE_HEADING,
        },
    };

    let security_reviewer = Stage {
        name: "security_reviewer",
        role: "On-Chain Security Heuristics Analyst",
        goal: "Scan wallet data for potential red flags or unusual activity patterns based on a \
               set of heuristics.",
        backstory: "You are a security-conscious on-chain analyst. You find patterns that are \
                    worth a second look.",
        task: PromptTemplate::new(
            "You will be given a 'Wallet Profile' analysis as context. Perform a security \
             analysis on the same raw data:\n\n{wallet_data}\n\n\
             Create your analysis as a bullet-point list under the heading \
             '### Security Observations'. Consider:\n\
             - **Token Dust:** Is the 'total_asset_classes' number high?\n\
             - **Transaction Velocity:** Is there a full list of recent transactions?\n\
             - **Overall Risk Profile:** Provide a one-sentence summary.\n\n\
             Return only the 'Security Observations' section.",
        ),
        expected_output: "A bullet-point list under the heading '### Security Observations'.",
        depends_on: vec!["analyst"],
        mode: StageMode::Infer,
        output: OutputPolicy::AfterDependency {
            dependency: "analyst",
            heading: SECURITY_HEADING,
        },
    };

    StagePlan::new(vec![collector, analyst, security_reviewer])
}

/// One comparative stage over two wallets.
///
/// Variables: `wallet_1_data`, `wallet_2_data`.
pub fn duel_plan() -> Result<StagePlan, PipelineError> {
    let comparative_analyst = Stage {
        name: "comparative_analyst",
        role: "Expert Comparative On-Chain Analyst",
        goal: "Analyze and compare the on-chain data from two different Cardano wallets.",
        backstory: "You are an expert in on-chain forensics, specializing in comparing wallet \
                    behaviors.",
        task: PromptTemplate::new(
            "Analyze the provided JSON data for two wallets and create a comparative report in \
             Markdown format under the heading '### Wallet Duel Analysis'.\n\n\
             --- Wallet 1 Data ---\n{wallet_1_data}\n\n--- Wallet 2 Data ---\n{wallet_2_data}\n\n\
             Answer the following:\n\
             - **Primary Activity:** How do their primary activities compare?\n\
             - **Asset Diversity:** Which wallet holds more diverse assets?\n\
             - **Activity Level:** Which wallet appears more active?\n\
             - **Overall Comparison:** What is the key difference or similarity between them?",
        ),
        expected_output: "A concise, Markdown-formatted, bullet-point summary under the heading \
                          '### Wallet Duel Analysis'.",
        depends_on: vec![],
        mode: StageMode::Infer,
        output: OutputPolicy::Section {
            heading: DUEL_HEADING,
        },
    };

    StagePlan::new(vec![comparative_analyst])
}
