//! Integration tests for the gesture pipeline: training, conversion,
//! persistence and playback working together on real files.

use emg_gesture_pipeline::config::{StreamConfig, TrainingSource};
use emg_gesture_pipeline::core::{Model, ModelKind, ModelRef, ReductionKind, SamplePayload};
use emg_gesture_pipeline::recording::{RecordingFormat, RecordingReader, RecordingWriter};
use emg_gesture_pipeline::stream::{Playback, PlaybackStep, Recorder, Stream, StreamState};
use emg_gesture_pipeline::{training, PipelineError};
use std::path::{Path, PathBuf};

fn test_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join(format!("emg-pipeline-test-{}", std::process::id()))
        .join(name);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn test_config() -> StreamConfig {
    StreamConfig {
        smoothing_window: 5,
        vote_window: 10,
        components: 2,
        ..StreamConfig::default()
    }
}

fn idle_row(i: usize) -> [i32; 8] {
    let mut row = [0; 8];
    for (c, v) in row.iter_mut().enumerate() {
        *v = ((i * 7 + c * 3) % 5) as i32 - 2;
    }
    row
}

fn fist_row(i: usize) -> [i32; 8] {
    let mut row = [0; 8];
    for (c, v) in row.iter_mut().enumerate() {
        *v = if c < 4 {
            let magnitude = 100 + ((i + c) % 7) as i32;
            if i % 2 == 0 {
                magnitude
            } else {
                -magnitude
            }
        } else {
            ((i + c) % 5) as i32 - 2
        };
    }
    row
}

fn write_raw(path: &Path, rows: usize, row: fn(usize) -> [i32; 8]) {
    let mut writer = RecordingWriter::create(path, RecordingFormat::Raw { channels: 8 }).unwrap();
    for i in 0..rows {
        writer.write_row(&format!("{}", 1_000 + i), &row(i)).unwrap();
    }
    writer.finish().unwrap();
}

/// Raw training recordings for two gestures.
fn raw_training_set(dir: &Path) -> Vec<PathBuf> {
    let idle = dir.join("idle_001.csv");
    let fist = dir.join("fist_001.csv");
    write_raw(&idle, 60, idle_row);
    write_raw(&fist, 60, fist_row);
    vec![idle, fist]
}

/// Convert raw recordings into reduced recordings with the stream's projection.
fn convert(stream: &mut Stream, files: &[PathBuf], out_dir: &Path) -> Vec<PathBuf> {
    files
        .iter()
        .map(|path| {
            stream.reset();
            let reader = RecordingReader::open(path, 8).unwrap();
            let target = out_dir.join(path.file_name().unwrap());
            let mut recorder = Recorder::create(&target, stream, reader.format()).unwrap();
            for record in reader {
                let record = record.unwrap();
                let output = stream.process(&record.payload);
                recorder.record(&record, &output).unwrap();
            }
            recorder.finish().unwrap();
            target
        })
        .collect()
}

#[test]
fn test_train_convert_and_play() {
    let dir = test_dir("full");
    let raw = raw_training_set(&dir);
    let config = test_config();

    let projection = training::fit_reduction(&raw, ReductionKind::Pca, &config).unwrap();
    let mut stream = Stream::new(config.clone()).with_reduction(projection);

    let converted = convert(&mut stream, &raw, &test_dir("full-converted"));
    let reader = RecordingReader::open(&converted[0], 8).unwrap();
    assert_eq!(reader.format(), RecordingFormat::Reduced { components: 2 });
    assert_eq!(reader.count(), 60);

    let classifier = training::fit_classifier(&converted, &config).unwrap();
    assert_eq!(classifier.classes(), ["fist".to_string(), "idle".to_string()]);
    let mut stream = stream.with_classifier(classifier);
    stream.reset();

    let mut playback = Playback::open(&raw[1], 8).unwrap();
    let mut gestures = Vec::new();
    loop {
        match playback.play_frame(&mut stream).unwrap() {
            PlaybackStep::Frame(frame) => gestures.push(frame.output.gesture),
            PlaybackStep::Ended => break,
            PlaybackStep::Paused => unreachable!(),
        }
    }

    assert_eq!(gestures.len(), 60);
    assert!(gestures[..10].iter().all(Option::is_none));
    assert_eq!(gestures[59].as_deref(), Some("fist"));
    assert_eq!(stream.state(), StreamState::Ended);
}

#[test]
fn test_end_then_reset_starts_fresh_session() {
    let dir = test_dir("reset");
    let raw = raw_training_set(&dir);
    let config = test_config();
    let projection = training::fit_reduction(&raw, ReductionKind::Pca, &config).unwrap();
    let mut stream = Stream::new(config).with_reduction(projection);

    let mut playback = Playback::open(&raw[0], 8).unwrap();
    let mut first = None;
    while let PlaybackStep::Frame(frame) = playback.play_frame(&mut stream).unwrap() {
        first.get_or_insert(frame.output);
    }
    assert!(stream.is_ended());

    stream.reset();
    assert_eq!(stream.state(), StreamState::Created);
    assert!(stream.reduction().is_some());

    let mut playback = Playback::open(&raw[0], 8).unwrap();
    match playback.play_frame(&mut stream).unwrap() {
        PlaybackStep::Frame(frame) => assert_eq!(Some(frame.output), first),
        other => panic!("unexpected step {other:?}"),
    }
}

#[test]
fn test_pretrained_model_matches_fitted() {
    let dir = test_dir("pretrained");
    let raw = raw_training_set(&dir);
    let config = test_config();

    let fitted = Stream::from_sources(
        config.clone(),
        Some((ReductionKind::Pca, TrainingSource::Files(raw.clone()))),
        None,
    )
    .unwrap();
    let model_path = dir.join("model.pca");
    let model = fitted.current_model().unwrap();
    assert_eq!(model.kind(), ModelKind::Pca);
    model.save_to_path(&model_path).unwrap();

    let mut fitted = fitted;
    let mut loaded = Stream::from_sources(
        config.clone(),
        Some((ReductionKind::Pca, TrainingSource::from_args([&model_path]))),
        None,
    )
    .unwrap();

    for i in 0..20 {
        let payload = SamplePayload::Raw(fist_row(i).to_vec());
        let a = fitted.process(&payload).reduced;
        let b = loaded.process(&payload).reduced;
        let a_bits: Vec<u64> = a.iter().map(|v| v.to_bits()).collect();
        let b_bits: Vec<u64> = b.iter().map(|v| v.to_bits()).collect();
        assert_eq!(a_bits, b_bits);
    }

    // A PCA file is not an ICA model
    let err = Stream::from_sources(
        config,
        Some((ReductionKind::Ica, TrainingSource::PretrainedModel(model_path))),
        None,
    )
    .err()
    .unwrap();
    assert!(matches!(err, PipelineError::ModelKindMismatch { .. }));
}

#[test]
fn test_classifier_dimension_must_match_projection() {
    let dir = test_dir("dimension");
    let raw = raw_training_set(&dir);
    let config = test_config();

    let projection = training::fit_reduction(&raw, ReductionKind::Pca, &config).unwrap();
    let mut stream = Stream::new(config.clone()).with_reduction(projection);
    let converted = convert(&mut stream, &raw, &test_dir("dimension-converted"));
    let classifier = training::fit_classifier(&converted, &config).unwrap();
    let svm_path = dir.join("model.svm");
    ModelRef::Classifier(&classifier)
        .save_to_path(&svm_path)
        .unwrap();
    assert_eq!(
        Model::load_from_path(&svm_path).unwrap().kind(),
        ModelKind::Svm
    );

    let wider = config.with_components(3);
    let err = Stream::from_sources(
        wider,
        Some((ReductionKind::Pca, TrainingSource::Files(raw))),
        Some(TrainingSource::PretrainedModel(svm_path)),
    )
    .err()
    .unwrap();
    assert!(matches!(
        err,
        PipelineError::DimensionMismatch {
            expected: 3,
            actual: 2
        }
    ));
}

#[test]
fn test_invalid_recording_is_rejected_before_output() {
    let dir = test_dir("invalid");
    let path = dir.join("broken.csv");
    std::fs::write(&path, "when,x1,x2\n1,2,3\n").unwrap();

    let err = Playback::open(&path, 8).err().unwrap();
    assert!(matches!(err, PipelineError::InvalidHeader { .. }));

    // Training skips it, leaving nothing to fit on
    let err =
        training::fit_reduction(&[path], ReductionKind::Ica, &test_config()).unwrap_err();
    assert!(matches!(err, PipelineError::EmptyTrainingSet));
}
