use super::{quote, render, write, EmitSettings, Schedulers};
use crate::plan::{JobPlan, PlanRequest, Walltime};
use itertools::Itertools;
use std::path::PathBuf;

fn settings(scheduler: Schedulers) -> EmitSettings {
    EmitSettings {
        scheduler,
        executable: "ThermoRawFileParser".to_owned(),
        input_flag: "-i".to_owned(),
        prefix: "rawExtract".to_owned(),
        working_dir: PathBuf::from("/data/run"),
    }
}

fn plan(count: usize, jobs: usize, processors: usize) -> JobPlan {
    let items = (1..=count).map(|i| format!("f{i}.raw")).collect_vec();

    JobPlan::build(
        &items,
        PlanRequest {
            jobs,
            processors,
            memory: None,
            walltime: Walltime::default(),
        },
    )
    .unwrap()
}

#[test]
pub fn pbs_script_layout() {
    let plan = plan(5, 1, 2);
    let unit = render(&plan.batches[0], &settings(Schedulers::Pbs));

    assert_eq!(unit.index, 0);
    assert_eq!(unit.name, "rawExtract_0.pbs");
    assert_eq!(
        unit.script,
        "#!/bin/bash\n\
         #PBS -l mem=8gb,nodes=1:ppn=2,walltime=12:00:00\n\
         \n\
         cd /data/run\n\
         ThermoRawFileParser -i f1.raw; ThermoRawFileParser -i f2.raw; ThermoRawFileParser -i f3.raw > stdout_0_0.txt &\n\
         ThermoRawFileParser -i f4.raw; ThermoRawFileParser -i f5.raw > stdout_0_1.txt &\n\
         wait\n"
    );
}

#[test]
pub fn slurm_script_directives() {
    let plan = plan(2, 1, 4);
    let unit = render(&plan.batches[0], &settings(Schedulers::Slurm));

    assert_eq!(unit.name, "rawExtract_0.slurm");
    assert!(unit.script.starts_with(
        "#!/bin/bash\n\
         #SBATCH --mem=16G\n\
         #SBATCH --nodes=1\n\
         #SBATCH --ntasks=1\n\
         #SBATCH --cpus-per-task=2\n\
         #SBATCH --time=12:00:00\n\
         \n\
         cd /data/run\n"
    ));
    assert!(unit.script.ends_with("> stdout_0_1.txt &\nwait\n"));
}

#[test]
pub fn output_files_never_collide() {
    let plan = plan(10, 3, 4);
    let settings = settings(Schedulers::Pbs);

    let outputs = plan
        .iter()
        .map(|batch| render(batch, &settings))
        .flat_map(|unit| {
            unit.script
                .lines()
                .filter_map(|line| line.split("> ").nth(1).map(str::to_owned))
                .collect_vec()
        })
        .collect_vec();

    // 4 + 4 + 2 worker slots, idle slots produce no line
    assert_eq!(outputs.len(), 10);
    assert_eq!(outputs.iter().unique().count(), outputs.len());
    assert_eq!(outputs[9], "stdout_2_1.txt &");
}

#[test]
pub fn units_are_numbered_sequentially() {
    let plan = plan(10, 3, 4);
    let settings = settings(Schedulers::Pbs);

    let names = plan
        .iter()
        .map(|batch| render(batch, &settings).name)
        .collect_vec();

    assert_eq!(
        names,
        vec!["rawExtract_0.pbs", "rawExtract_1.pbs", "rawExtract_2.pbs"]
    );
}

#[test]
pub fn every_file_is_invoked_once() {
    let plan = plan(13, 2, 3);
    let settings = settings(Schedulers::Pbs);

    let invoked = plan
        .iter()
        .map(|batch| render(batch, &settings).script)
        .flat_map(|script| {
            script
                .lines()
                .flat_map(|line| line.split(|c| c == ';' || c == '>'))
                .filter_map(|part| part.trim().strip_prefix("ThermoRawFileParser -i "))
                .map(str::to_owned)
                .collect_vec()
        })
        .collect_vec();

    assert_eq!(invoked, (1..=13).map(|i| format!("f{i}.raw")).collect_vec());
}

#[test]
pub fn empty_input_flag_is_left_out() {
    let plan = plan(1, 1, 1);
    let mut settings = settings(Schedulers::Pbs);
    settings.executable = "convert".to_owned();
    settings.input_flag = String::new();

    let unit = render(&plan.batches[0], &settings);

    assert!(unit.script.contains("\nconvert f1.raw > stdout_0_0.txt &\n"));
}

#[test]
pub fn write_persists_script() {
    let directory = tempfile::tempdir().unwrap();
    let plan = plan(3, 1, 4);
    let unit = render(&plan.batches[0], &settings(Schedulers::Pbs));

    let path = write(&unit, directory.path()).unwrap();

    assert_eq!(path, directory.path().join("rawExtract_0.pbs"));
    assert_eq!(std::fs::read_to_string(path).unwrap(), unit.script);
}

#[test]
pub fn write_into_missing_directory_fails() {
    let directory = tempfile::tempdir().unwrap();
    let plan = plan(3, 1, 4);
    let unit = render(&plan.batches[0], &settings(Schedulers::Pbs));

    assert!(write(&unit, &directory.path().join("missing")).is_err());
}

#[test]
pub fn awkward_names_are_quoted() {
    let items = vec!["my run.raw".to_owned(), "a;rm -rf x.raw".to_owned()];
    let plan = JobPlan::build(
        &items,
        PlanRequest {
            processors: 1,
            ..PlanRequest::default()
        },
    )
    .unwrap();
    let settings = EmitSettings {
        working_dir: PathBuf::from("/data/My Run"),
        ..settings(Schedulers::Pbs)
    };

    let unit = render(&plan.batches[0], &settings);

    assert!(unit.script.contains("\ncd '/data/My Run'\n"));
    assert!(unit.script.contains(
        "\nThermoRawFileParser -i 'my run.raw'; ThermoRawFileParser -i 'a;rm -rf x.raw' > stdout_0_0.txt &\n"
    ));
}

#[test]
pub fn quote_leaves_plain_words_alone() {
    assert_eq!(quote("f1.raw"), "f1.raw");
    assert_eq!(quote("/data/run_2/sample-A.raw"), "/data/run_2/sample-A.raw");
    assert_eq!(quote(""), "''");
    assert_eq!(quote("a&b"), "'a&b'");
    assert_eq!(quote("$HOME"), "'$HOME'");
    assert_eq!(quote("it's.raw"), "'it'\\''s.raw'");
}
