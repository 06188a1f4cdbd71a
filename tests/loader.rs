use std::path::{Path, PathBuf};
use std::sync::Arc;

use alphasat_viewer::data::loader::{load_channel, load_dataset, load_events, load_series_file};
use alphasat_viewer::data::model::EventKind;
use alphasat_viewer::Error;
use arrow::array::{Float64Array, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use parquet::arrow::ArrowWriter;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("alphasat-loader-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2019, 7, 3).unwrap().and_hms_opt(10, 0, 0).unwrap()
}

fn write_parquet(path: &Path, n: usize) {
    let millis: Vec<i64> = (0..n as i64)
        .map(|i| (t0() + Duration::seconds(i)).and_utc().timestamp_millis())
        .collect();
    let schema = Arc::new(Schema::new(vec![
        Field::new("time", DataType::Timestamp(TimeUnit::Millisecond, None), false),
        Field::new("signal", DataType::Float64, true),
        Field::new("noise", DataType::Float64, false),
    ]));
    let signal: Float64Array = (0..n).map(|i| if i == 1 { None } else { Some(-(i as f64)) }).collect();
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(TimestampMillisecondArray::from(millis)),
            Arc::new(signal),
            Arc::new(Float64Array::from(vec![-40.0; n])),
        ],
    )
    .unwrap();
    let file = std::fs::File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

#[test]
fn csv_channel_with_missing_value() {
    let dir = temp_dir("csv");
    std::fs::write(
        dir.join("test_ch1.csv"),
        "time,signal,noise\n\
         2019-07-03 10:00:00,-10.5,-40.0\n\
         2019-07-03 10:00:01,,-40.5\n\
         2019-07-03 10:00:02,-11.0,-41.0\n",
    )
    .unwrap();

    let series = load_channel(&dir, "test", 1).unwrap();
    assert_eq!(series.len(), 3);
    assert_eq!(series.channel, 1);
    assert_eq!(series.time[2], t0() + Duration::seconds(2));
    assert_eq!(series.signal[0], -10.5);
    assert!(series.signal[1].is_nan());
    assert_eq!(series.noise, vec![-40.0, -40.5, -41.0]);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn parquet_is_preferred_and_nulls_become_nan() {
    let dir = temp_dir("parquet");
    write_parquet(&dir.join("test_ch2.parquet"), 5);
    std::fs::write(dir.join("test_ch2.csv"), "time,signal,noise\n").unwrap();

    let series = load_channel(&dir, "test", 2).unwrap();
    assert_eq!(series.len(), 5);
    assert_eq!(series.time[0], t0());
    assert!(series.signal[1].is_nan());
    assert_eq!(series.signal[4], -4.0);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn json_records_with_string_and_epoch_times() {
    let dir = temp_dir("json");
    let ms = (t0() + Duration::seconds(1)).and_utc().timestamp_millis();
    std::fs::write(
        dir.join("test_ch3.json"),
        format!(
            r#"[{{"time": "2019-07-03T10:00:00", "signal": -9.0, "noise": -39.0}},
                {{"time": {ms}, "signal": -9.5, "noise": -39.5}}]"#
        ),
    )
    .unwrap();

    let series = load_channel(&dir, "test", 3).unwrap();
    assert_eq!(series.time, vec![t0(), t0() + Duration::seconds(1)]);
    assert_eq!(series.signal, vec![-9.0, -9.5]);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_channel_is_data_not_found() {
    let dir = temp_dir("missing");
    for ch in [1, 2, 4] {
        write_parquet(&dir.join(format!("test_ch{ch}.parquet")), 3);
    }
    let err = load_dataset(&dir, "test", &[1, 2, 3, 4]).unwrap_err();
    assert!(
        matches!(err, Error::DataNotFound { channel: 3, ref dataset, .. } if dataset == "test"),
        "{err}"
    );
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn unsorted_and_malformed_series_are_rejected() {
    let dir = temp_dir("unsorted");
    let path = dir.join("bad.csv");
    std::fs::write(
        &path,
        "time,signal,noise\n2019-07-03 10:00:01,1,1\n2019-07-03 10:00:00,1,1\n",
    )
    .unwrap();
    assert!(matches!(
        load_series_file(&path, 1),
        Err(Error::UnsortedIndex { row: 1, .. })
    ));

    std::fs::write(&path, "time,signal\n2019-07-03 10:00:00,1\n").unwrap();
    assert!(matches!(
        load_series_file(&path, 1),
        Err(Error::MissingColumn { ref column, .. }) if column == "noise"
    ));

    std::fs::write(&path, "time,signal,noise\n2019-07-03 10:00:00,abc,1\n").unwrap();
    assert!(matches!(load_series_file(&path, 1), Err(Error::BadValue { row: 0, .. })));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn event_log_csv() {
    let dir = temp_dir("events");
    let path = dir.join("events.csv");
    std::fs::write(
        &path,
        "DATE,TIME START,TIME STOP,EVENT\n\
         2019-07-03,10:00:00,10:05:00,rain\n\
         2019-07-03,0 days 23:00:00,1 days 00:30:00,failure\n\
         2019-07-04,01:00,02:00,Rain\n",
    )
    .unwrap();

    let events = load_events(&path).unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].start(), t0());
    assert_eq!(events[0].stop(), t0() + Duration::minutes(5));
    assert_eq!(events[1].kind, EventKind::Failure);
    assert_eq!(
        events[1].stop(),
        NaiveDate::from_ymd_opt(2019, 7, 4).unwrap().and_hms_opt(0, 30, 0).unwrap()
    );
    // case-sensitive: "Rain" is not a rain event
    assert_eq!(events[2].kind, EventKind::Other("Rain".into()));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn malformed_event_row_aborts_load() {
    let dir = temp_dir("bad-events");
    let path = dir.join("events.csv");
    std::fs::write(
        &path,
        "DATE,TIME START,TIME STOP,EVENT\n\
         2019-07-03,10:00:00,10:05:00,rain\n\
         2019-07-03,ten o'clock,10:05:00,rain\n",
    )
    .unwrap();
    assert!(matches!(load_events(&path), Err(Error::MalformedEvent { row: 1, .. })));

    std::fs::write(&path, "DATE,TIME START,EVENT\n2019-07-03,10:00:00,rain\n").unwrap();
    assert!(matches!(load_events(&path), Err(Error::MalformedEvent { row: 0, .. })));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn event_offsets_past_the_calendar_are_malformed() {
    let dir = temp_dir("far-events");
    let path = dir.join("events.csv");
    std::fs::write(
        &path,
        "DATE,TIME START,TIME STOP,EVENT\n\
         2019-07-03,200000000 days 00:00:00,200000001 days 00:00:00,rain\n",
    )
    .unwrap();
    assert!(matches!(load_events(&path), Err(Error::MalformedEvent { row: 0, .. })));

    std::fs::write(
        &path,
        "DATE,TIME START,TIME STOP,EVENT\n\
         2019-07-03,10:00:00,10:05:00,rain\n\
         2019-07-03,9999999999999999:00,10:05:00,rain\n",
    )
    .unwrap();
    assert!(matches!(load_events(&path), Err(Error::MalformedEvent { row: 1, .. })));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn event_log_json() {
    let dir = temp_dir("json-events");
    let path = dir.join("events.json");
    std::fs::write(
        &path,
        r#"[{"DATE": "2019-07-03", "TIME START": "10:00:00", "TIME STOP": "10:05:00", "EVENT": "rain"},
            {"DATE": "2019-07-03", "TIME START": "22:00", "TIME STOP": "23:30", "EVENT": "failure"}]"#,
    )
    .unwrap();
    let events = load_events(&path).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].start(), t0());
    assert_eq!(events[1].kind, EventKind::Failure);

    // a wrongly typed field names its row
    std::fs::write(
        &path,
        r#"[{"DATE": "2019-07-03", "TIME START": "10:00", "TIME STOP": "10:05", "EVENT": "rain"},
            {"DATE": 20190703, "TIME START": "11:00", "TIME STOP": "11:05", "EVENT": "rain"}]"#,
    )
    .unwrap();
    let err = load_events(&path).unwrap_err();
    assert!(matches!(err, Error::MalformedEvent { row: 1, .. }), "{err}");
    std::fs::remove_dir_all(&dir).unwrap();
}
