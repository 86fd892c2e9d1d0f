use anyhow::{bail, ensure, Result};
use itertools::Itertools;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Workflow {
    GermlineVariantCalling,
    SomaticVariantCalling,
    StructuralVariantCalling,
}

// Whether a workflow name is listed when the user gives an invalid one
enum UserHelp {
    Visible,
    Hidden,
}

const ALLOWED_WORKFLOW_INPUTS: [(&str, Workflow, UserHelp); 4] = [
    (
        "somatic-variant-calling",
        Workflow::SomaticVariantCalling,
        UserHelp::Visible,
    ),
    (
        "germline-variant-calling",
        Workflow::GermlineVariantCalling,
        UserHelp::Visible,
    ),
    (
        "structural-variant-calling",
        Workflow::StructuralVariantCalling,
        UserHelp::Visible,
    ),
    // Older name of somatic-variant-calling.
    (
        "cancer-variant-calling",
        Workflow::SomaticVariantCalling,
        UserHelp::Hidden,
    ),
];

impl Workflow {
    pub fn name(self) -> &'static str {
        match self {
            Workflow::GermlineVariantCalling => "germline-variant-calling",
            Workflow::SomaticVariantCalling => "somatic-variant-calling",
            Workflow::StructuralVariantCalling => "structural-variant-calling",
        }
    }
}

impl FromStr for Workflow {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Workflow> {
        if let Some((_, workflow, _)) = ALLOWED_WORKFLOW_INPUTS.iter().find(|(name, _, _)| *name == s)
        {
            return Ok(*workflow);
        }
        bail!(
            "{s} is an invalid input to `--workflow`. Supported options are:\n - {}",
            ALLOWED_WORKFLOW_INPUTS
                .iter()
                .filter_map(|(name, _, help)| match help {
                    UserHelp::Visible => Some(*name),
                    UserHelp::Hidden => None,
                })
                .join("\n - ")
        )
    }
}

impl Display for Workflow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The validated set of workflows for one run: exactly one of germline or
/// somatic variant calling, optionally with structural variant calling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkflowSelection {
    variant_calling: Workflow,
    structural_variants: bool,
}

impl WorkflowSelection {
    /// Validate the requested workflows. `include_sv` adds structural variant
    /// calling on top of whatever was requested with `--workflow`.
    pub fn new(
        requested: impl IntoIterator<Item = Workflow>,
        include_sv: bool,
    ) -> Result<WorkflowSelection> {
        let requested: Vec<Workflow> = requested.into_iter().unique().collect();
        ensure!(
            !requested.is_empty(),
            "At least one workflow must be given with --workflow"
        );

        let structural_variants =
            include_sv || requested.contains(&Workflow::StructuralVariantCalling);
        let germline = requested.contains(&Workflow::GermlineVariantCalling);
        let somatic = requested.contains(&Workflow::SomaticVariantCalling);

        let variant_calling = match (germline, somatic) {
            (true, false) => Workflow::GermlineVariantCalling,
            (false, true) => Workflow::SomaticVariantCalling,
            (true, true) => bail!(
                "{} cannot be run together with {}",
                Workflow::SomaticVariantCalling,
                Workflow::GermlineVariantCalling
            ),
            (false, false) => bail!(
                "{} must be run with {} or {}",
                Workflow::StructuralVariantCalling,
                Workflow::GermlineVariantCalling,
                Workflow::SomaticVariantCalling
            ),
        };

        Ok(WorkflowSelection {
            variant_calling,
            structural_variants,
        })
    }

    /// Either germline or somatic variant calling.
    pub fn variant_calling(&self) -> Workflow {
        self.variant_calling
    }

    pub fn is_somatic(&self) -> bool {
        self.variant_calling == Workflow::SomaticVariantCalling
    }

    pub fn structural_variants(&self) -> bool {
        self.structural_variants
    }

    pub fn workflows(&self) -> Vec<Workflow> {
        let mut workflows = vec![self.variant_calling];
        if self.structural_variants {
            workflows.push(Workflow::StructuralVariantCalling);
        }
        workflows
    }
}

impl Display for WorkflowSelection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.workflows().iter().join(" + "))
    }
}
