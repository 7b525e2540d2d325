use std::fmt::Write as _;
use std::fs;

use criterion::{Criterion, criterion_group, criterion_main};
use tempfile::TempDir;
use trial_merge::cli::OutputMode;
use trial_merge::config::PipelineConfig;
use trial_merge::pipeline::{BuildRequest, TrialTableBuilder};

const HEADER: &str = "participant,session,trial,block,image_file,music_file,\
practice_valence_resp.keys,valence_resp.keys,arousal_resp.keys,fear_resp.keys,frameRate";

fn generate_sessions(files: usize, trials: usize) -> TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    for participant in 0..files {
        let mut body = String::new();
        writeln!(body, "{HEADER}").expect("header");
        writeln!(body, "p{participant:03},1,,,,,,,,,60").expect("welcome row");
        for trial in 0..trials {
            let practice = trial < 4;
            let (practice_key, main_key) = if practice {
                (format!("num_{}", trial % 9 + 1), String::new())
            } else {
                (String::new(), format!("num_{}", trial % 9 + 1))
            };
            writeln!(
                body,
                "p{participant:03},1,{trial},{},images\\set{}\\img{trial}.png,music/track{}.wav,{practice_key},{main_key},num_{},num_{},60",
                if practice { "practice" } else { "main" },
                trial % 3,
                trial % 5,
                trial % 7 + 1,
                trial % 4 + 1,
            )
            .expect("trial row");
        }
        fs::write(dir.path().join(format!("p{participant:03}.csv")), body).expect("write session");
    }
    dir
}

fn bench_build(c: &mut Criterion) {
    let sessions = generate_sessions(40, 120);
    let builder = TrialTableBuilder::new(PipelineConfig::default()).expect("builder");

    let mut group = c.benchmark_group("build");
    for mode in [OutputMode::Summary, OutputMode::Full] {
        let request = BuildRequest::new(sessions.path(), mode);
        group.bench_function(mode.to_string(), |b| {
            b.iter(|| builder.build(&request).expect("build"))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build);
criterion_main!(benches);
