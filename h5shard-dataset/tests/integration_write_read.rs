use std::path::Path;

use h5shard_dataset::{
    convert_arrays_to_sharded_h5, DatasetOptions, H5Array, H5DataType, H5Dataset, H5ShardError,
    IndexedDataset, IntoH5Array, WriterOptions,
};
use ndarray::{array, Array1, ArrayD, IxDyn};

fn f32_samples() -> Vec<Array1<f32>> {
    vec![
        array![0.0, 1.0, 2.0, 3.0],
        array![4.0, 5.0, 6.0, 7.0],
        array![8.0, 9.0, 10.0, 11.0],
    ]
}

fn assert_file_closed(path: &Path) {
    // HDF5 refuses to truncate a file that still has an open handle.
    hdf5::File::create(path).expect("file should have no open handles");
}

#[test]
fn named_samples_round_trip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let dataset_path = dir.path().join("out.hdf5");
    let samples = f32_samples();

    let summary = convert_arrays_to_sharded_h5(
        samples.clone(),
        &dataset_path,
        WriterOptions::default().with_identifiers(["a", "b", "c"]),
    )?;

    assert_eq!(summary.parts_dir, dir.path().join("out.hdf5.parts"));
    for id in ["a", "b", "c"] {
        assert!(summary.parts_dir.join(format!("{}.hdf5", id)).exists());
    }

    let dataset = H5Dataset::open(&dataset_path)?;
    assert_eq!(dataset.len(), 3);
    assert_eq!(dataset.keys(), &["/data/a", "/data/b", "/data/c"]);

    for (index, sample) in samples.into_iter().enumerate() {
        let item = dataset.get(index)?;
        assert_eq!(item.dtype(), H5DataType::F32);
        assert_eq!(item.shape(), &[4]);
        assert_eq!(item, H5Array::F32(sample.into_dyn()));
    }
    Ok(())
}

#[test]
fn positional_identifiers_preserve_dtype_and_shape() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let dataset_path = dir.path().join("nested").join("mixed.hdf5");

    let samples = vec![
        array![1.5f32, -2.5].into_h5_array()?,
        ArrayD::from_shape_fn(IxDyn(&[2, 3]), |idx| (idx[0] * 3 + idx[1]) as i64).into(),
        ArrayD::from_shape_fn(IxDyn(&[2, 2, 2]), |idx| (idx[0] + idx[1] + idx[2]) as u8).into(),
        array![true, false, true].into_h5_array()?,
        ArrayD::from_elem(IxDyn(&[]), 42.0f64).into(),
    ];

    convert_arrays_to_sharded_h5(samples.clone(), &dataset_path, WriterOptions::default())?;

    let dataset = H5Dataset::open(&dataset_path)?;
    assert_eq!(dataset.len(), samples.len());
    assert_eq!(
        dataset.keys(),
        &["/data/0", "/data/1", "/data/2", "/data/3", "/data/4"]
    );

    let decoded = dataset.iter().collect::<Result<Vec<_>, _>>()?;
    assert_eq!(decoded, samples);
    Ok(())
}

#[test]
fn summary_keys_keep_sample_order_past_ten_samples() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let dataset_path = dir.path().join("many.hdf5");
    let samples = (0..12).map(|i| array![i as i32]).collect::<Vec<_>>();

    let summary = convert_arrays_to_sharded_h5(samples, &dataset_path, WriterOptions::default())?;

    // Discovery sorts by name, so "10" comes before "2".
    let discovered = H5Dataset::open(&dataset_path)?;
    assert_eq!(discovered.key(2)?, "/data/10");

    let ordered = H5Dataset::with_options(
        &dataset_path,
        DatasetOptions::default().with_keys(summary.item_keys()),
    )?;
    assert_eq!(ordered.len(), 12);
    for index in 0..12 {
        let item: ArrayD<i32> = ordered.get(index)?.try_into()?;
        assert_eq!(item, array![index as i32].into_dyn());
    }
    Ok(())
}

#[test]
fn rerun_overwrites_previous_content() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let dataset_path = dir.path().join("out.hdf5");
    let options = WriterOptions::default().with_identifiers(["a", "b", "c"]);

    convert_arrays_to_sharded_h5(f32_samples(), &dataset_path, options.clone())?;

    let replacement = vec![
        array![[1i16, 2], [3, 4]],
        array![[5i16, 6], [7, 8]],
        array![[9i16, 10], [11, 12]],
    ];
    convert_arrays_to_sharded_h5(replacement.clone(), &dataset_path, options)?;

    let dataset = H5Dataset::open(&dataset_path)?;
    assert_eq!(dataset.len(), 3);
    for (index, sample) in replacement.into_iter().enumerate() {
        assert_eq!(dataset.get(index)?, H5Array::I16(sample.into_dyn()));
    }
    Ok(())
}

#[test]
fn missing_explicit_key_fails_construction() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let dataset_path = dir.path().join("out.hdf5");
    convert_arrays_to_sharded_h5(
        f32_samples(),
        &dataset_path,
        WriterOptions::default().with_identifiers(["a", "b", "c"]),
    )?;

    let options = DatasetOptions::default().with_keys(["/data/a", "/data/zzz"]);
    match H5Dataset::with_options(&dataset_path, options) {
        Err(H5ShardError::KeyNotFound { key, path }) => {
            assert_eq!(key, "/data/zzz");
            assert_eq!(path, dataset_path);
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("construction should fail"),
    }

    assert_file_closed(&dataset_path);
    Ok(())
}

#[test]
fn out_of_range_index_fails_without_leaking_handles() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let dataset_path = dir.path().join("out.hdf5");
    convert_arrays_to_sharded_h5(f32_samples(), &dataset_path, WriterOptions::default())?;

    let dataset = H5Dataset::open(&dataset_path)?;
    dataset.get(0)?;

    let err = dataset.get(3).unwrap_err();
    assert!(matches!(
        err,
        H5ShardError::IndexOutOfRange { index: 3, len: 3 }
    ));
    assert!(matches!(
        dataset.get(usize::MAX),
        Err(H5ShardError::IndexOutOfRange { .. })
    ));

    assert_file_closed(&dataset_path);
    Ok(())
}

#[test]
fn persistent_handle_lives_as_long_as_the_dataset() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let dataset_path = dir.path().join("out.hdf5");
    let samples = f32_samples();
    convert_arrays_to_sharded_h5(samples.clone(), &dataset_path, WriterOptions::default())?;

    let dataset = H5Dataset::with_options(
        &dataset_path,
        DatasetOptions::default().keep_file_open(true),
    )?;
    assert!(dataset.keeps_file_open());
    assert_eq!(dataset.get(2)?, H5Array::F32(samples[2].clone().into_dyn()));
    assert!(dataset.get(7).is_err());

    assert!(hdf5::File::create(&dataset_path).is_err());
    drop(dataset);
    assert_file_closed(&dataset_path);
    Ok(())
}

#[test]
fn relocated_output_stays_readable() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let original = dir.path().join("original");
    let moved = dir.path().join("moved");

    convert_arrays_to_sharded_h5(
        f32_samples(),
        original.join("out.hdf5"),
        WriterOptions::default().with_identifiers(["a", "b", "c"]),
    )?;
    std::fs::rename(&original, &moved)?;

    let dataset = H5Dataset::open(moved.join("out.hdf5"))?;
    assert_eq!(dataset.len(), 3);
    assert_eq!(
        dataset.get(1)?,
        H5Array::F32(array![4.0f32, 5.0, 6.0, 7.0].into_dyn())
    );
    Ok(())
}

#[test]
fn custom_parts_dir_and_root_key() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let dataset_path = dir.path().join("index").join("train.h5");
    let parts_dir = dir.path().join("shards");

    let summary = convert_arrays_to_sharded_h5(
        f32_samples(),
        &dataset_path,
        WriterOptions::default()
            .with_root_key("/train/images")
            .with_parts_dir(&parts_dir)
            .with_shard_extension("h5")
            .with_identifiers(["x", "y", "z"]),
    )?;
    assert_eq!(summary.shard_paths[0], parts_dir.join("x.h5"));

    let shard = hdf5::File::open(parts_dir.join("y.h5"))?;
    let stored: ArrayD<f32> = shard.dataset("/train/images")?.read_dyn()?;
    assert_eq!(stored, array![4.0f32, 5.0, 6.0, 7.0].into_dyn());
    drop(shard);

    let dataset = H5Dataset::with_options(
        &dataset_path,
        DatasetOptions::default().with_root_key("/train/images"),
    )?;
    assert_eq!(
        dataset.keys(),
        &["/train/images/x", "/train/images/y", "/train/images/z"]
    );
    assert_eq!(
        dataset.get(2)?,
        H5Array::F32(array![8.0f32, 9.0, 10.0, 11.0].into_dyn())
    );
    Ok(())
}

#[test]
fn unconvertible_sample_is_rejected() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let samples = vec![
        (vec![2usize], vec![1.0f32, 2.0]),
        (vec![2usize, 2], vec![1.0f32, 2.0, 3.0]),
    ];

    let err = convert_arrays_to_sharded_h5(
        samples,
        dir.path().join("out.hdf5"),
        WriterOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, H5ShardError::Conversion(_)));
    assert!(dir.path().join("out.hdf5.parts").join("0.hdf5").exists());
    assert!(!dir.path().join("out.hdf5.parts").join("1.hdf5").exists());
    Ok(())
}

#[test]
fn empty_sample_sequence_creates_empty_root_group() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let dataset_path = dir.path().join("empty.hdf5");

    let summary = convert_arrays_to_sharded_h5(
        Vec::<Array1<f32>>::new(),
        &dataset_path,
        WriterOptions::default(),
    )?;
    assert!(summary.shard_paths.is_empty());
    assert!(summary.parts_dir.is_dir());

    let file = hdf5::File::open(&dataset_path)?;
    assert!(file.group("/data")?.member_names()?.is_empty());
    drop(file);

    let dataset = H5Dataset::open(&dataset_path)?;
    assert_eq!(dataset.len(), 0);
    assert!(dataset.is_empty());
    assert_eq!(dataset.iter().count(), 0);
    assert!(matches!(
        dataset.get(0),
        Err(H5ShardError::IndexOutOfRange { index: 0, len: 0 })
    ));
    Ok(())
}

#[test]
fn zero_size_samples_round_trip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let dataset_path = dir.path().join("zero.hdf5");

    let samples = vec![
        H5Array::F64(ArrayD::zeros(IxDyn(&[0]))),
        H5Array::I32(ArrayD::zeros(IxDyn(&[2, 0]))),
    ];
    convert_arrays_to_sharded_h5(
        samples.clone(),
        &dataset_path,
        WriterOptions::default().with_identifiers(["flat", "wide"]),
    )?;

    let dataset = H5Dataset::open(&dataset_path)?;
    assert_eq!(dataset.len(), 2);

    let flat = dataset.get(0)?;
    assert_eq!(flat.shape(), &[0]);
    assert_eq!(flat.dtype(), H5DataType::F64);
    assert!(flat.is_empty());

    let wide = dataset.get(1)?;
    assert_eq!(wide.shape(), &[2, 0]);
    assert_eq!(wide, samples[1]);
    Ok(())
}
