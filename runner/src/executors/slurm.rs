/*
 * Slurm variant of the job scripts:
 * one task per job owning all cpus, the worker slots are plain background processes
 * inside that task, so the node count stays fixed at 1 like for PBS.
 */

use crate::plan::Resources;

pub const SUBMIT_COMMAND: &str = "sbatch";
pub const EXTENSION: &str = "slurm";

pub fn directives(resources: &Resources) -> Vec<String> {
    vec![
        format!("#SBATCH --mem={}G", resources.memory),
        "#SBATCH --nodes=1".to_owned(),
        "#SBATCH --ntasks=1".to_owned(),
        format!("#SBATCH --cpus-per-task={}", resources.processors),
        format!("#SBATCH --time={}", resources.walltime),
    ]
}
