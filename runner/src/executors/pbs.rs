use crate::plan::Resources;

pub const SUBMIT_COMMAND: &str = "qsub";
pub const EXTENSION: &str = "pbs";

/// single `-l` resource list, PBS jobs always run on one node
pub fn directives(resources: &Resources) -> Vec<String> {
    vec![format!(
        "#PBS -l mem={}gb,nodes=1:ppn={},walltime={}",
        resources.memory, resources.processors, resources.walltime
    )]
}
