use blockmodel::io::{model_writer, read_json_model_file, OutputFormat};
use blockmodel::{Blockmodel, UndirectedGraph};
use flate2::write::GzEncoder;
use flate2::Compression;
use matrix_util::common_io::open_buf_writer;
use std::io::Write;

const EDGES: &str = "# two triangles and a bridge\n0 1\n1 2\n2 0\n3 4\n4 5\n5 3\n2 3 1.0\n";

#[test]
fn edge_list_from_plain_text() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("edges.txt");
    std::fs::write(&file, EDGES)?;

    let graph = UndirectedGraph::read_edge_list(file.to_str().unwrap())?;
    assert_eq!(graph.num_vertices(), 6);
    assert_eq!(graph.num_edges(), 7);
    assert_eq!(graph.neighbors(2), &[0, 1, 3]);
    Ok(())
}

#[test]
fn edge_list_from_gzip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("edges.txt.gz");
    let mut enc = GzEncoder::new(std::fs::File::create(&file)?, Compression::default());
    enc.write_all(EDGES.as_bytes())?;
    enc.finish()?;

    let graph = UndirectedGraph::read_edge_list(file.to_str().unwrap())?;
    assert_eq!(graph.num_vertices(), 6);
    assert_eq!(graph.num_edges(), 7);
    Ok(())
}

#[test]
fn malformed_lines_are_reported_with_their_position() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("bad.txt");
    std::fs::write(&file, "0 1\n1 x\n")?;
    let name = file.to_str().unwrap();

    let err = UndirectedGraph::read_edge_list(name).err().unwrap();
    assert!(err.to_string().contains(&format!("{}:2", name)), "{}", err);

    std::fs::write(&file, "0 1\n\n7\n")?;
    let err = UndirectedGraph::read_edge_list(name).err().unwrap();
    assert!(err.to_string().contains(&format!("{}:3", name)), "{}", err);
    Ok(())
}

#[test]
fn huge_vertex_ids_are_rejected() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("huge.txt");
    let name = file.to_str().unwrap();

    std::fs::write(&file, format!("0 1\n0 {}\n", usize::MAX))?;
    let err = UndirectedGraph::read_edge_list(name).err().unwrap();
    assert!(err.to_string().contains(&format!("{}:2", name)), "{}", err);

    std::fs::write(&file, "0 1\n2 3\n1000000000000 0\n")?;
    let err = UndirectedGraph::read_edge_list(name).err().unwrap();
    assert!(err.to_string().contains(&format!("{}:3", name)), "{}", err);
    Ok(())
}

#[test]
fn json_model_survives_a_file_round_trip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let graph = UndirectedGraph::from_edge_list(&[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3), (2, 3)])?;
    let model = Blockmodel::with_types(&graph, 2, vec![0, 0, 0, 1, 1, 1])?;

    for name in ["model.json", "model.json.gz"] {
        let file = dir.path().join(name);
        let file = file.to_str().unwrap();
        {
            let mut out = open_buf_writer(file)?;
            model_writer(OutputFormat::Json).write(&model, &mut out)?;
        }

        let read = read_json_model_file(file)?;
        assert_eq!(read.types, model.types());
        assert_eq!(read.num_vertices, 6);

        let rebuilt = read.into_blockmodel(&graph)?;
        assert!((rebuilt.log_likelihood() - model.log_likelihood()).abs() < 1e-12);
    }
    Ok(())
}

#[test]
fn plain_output_goes_to_gzip_files_too() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("model.txt.gz");
    let file = file.to_str().unwrap();

    let graph = UndirectedGraph::from_edge_list(&[(0, 1), (2, 3)])?;
    let model = Blockmodel::with_types(&graph, 2, vec![0, 0, 1, 1])?;
    {
        let mut out = open_buf_writer(file)?;
        model_writer(OutputFormat::Plain).write(&model, &mut out)?;
    }

    let lines = matrix_util::common_io::read_lines_of_words(file)?;
    let assignments: Vec<(String, String)> = lines
        .iter()
        .map(|l| (l.words[0].to_string(), l.words[1].to_string()))
        .collect();
    assert_eq!(
        assignments,
        vec![
            ("0".into(), "0".into()),
            ("1".into(), "0".into()),
            ("2".into(), "1".into()),
            ("3".into(), "1".into()),
        ]
    );
    Ok(())
}
