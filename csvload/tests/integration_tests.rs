//! Command-level tests driving `csvload::run` against SQLite.
//!
//! These go through argument parsing, URL resolution and the importer the
//! same way the binary does.

#![allow(clippy::unwrap_used)]
#![allow(clippy::uninlined_format_args)]

#[cfg(all(test, feature = "sqlite"))]
mod sqlite_integration {
    use clap::Parser;
    use csvload::{Cli, import, render_report, run};
    use csvload_core::{CsvLoadError, adapters::create_sink};
    use std::path::Path;

    fn write_csv(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(format!("{}.csv", name)), content).unwrap();
    }

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["csvload"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn test_sqlite_import_selected_tables() {
        let data = tempfile::tempdir().unwrap();
        write_csv(
            data.path(),
            "museum",
            "museum_id,name,city\n47,MoMA,New York\n48,Louvre,Paris\n",
        );
        write_csv(data.path(), "subject", "work_id,subject\n1,Portraits\n");
        let db = data.path().join("paint.db");
        let url = format!("sqlite://{}", db.display());

        let args = cli(&[
            "--database-url",
            &url,
            "--data-dir",
            data.path().to_str().unwrap(),
            "--table",
            "museum,subject",
            "--quiet",
        ]);
        run(&args).await.unwrap();

        let sink = create_sink(&url).await.unwrap();
        assert_eq!(sink.row_count("museum").await.unwrap(), 2);
        assert_eq!(sink.row_count("subject").await.unwrap(), 1);
        sink.close().await;
    }

    #[tokio::test]
    async fn test_sqlite_import_with_url_file() {
        let data = tempfile::tempdir().unwrap();
        write_csv(data.path(), "work", "work_id,name\n1,Sunflowers\n2,Irises\n3,Starry Night\n");
        let db = data.path().join("paint.db");
        let url = format!("sqlite://{}", db.display());
        let url_file = data.path().join("database.url");
        std::fs::write(&url_file, format!("{}\n", url)).unwrap();

        let args = cli(&[
            "import",
            "--database-url-file",
            url_file.to_str().unwrap(),
            "--data-dir",
            data.path().to_str().unwrap(),
            "--table",
            "work",
            "--json",
        ]);
        let report = import(&args).await.unwrap();

        let rendered = render_report(&report, args.json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["tables"][0]["table"], "work");
        assert_eq!(value["tables"][0]["rows"], 3);
        assert_eq!(value["tables"][0]["columns"], 2);

        let sink = create_sink(&url).await.unwrap();
        assert_eq!(sink.row_count("work").await.unwrap(), 3);
        sink.close().await;
    }

    #[tokio::test]
    async fn test_run_with_json_output() {
        let data = tempfile::tempdir().unwrap();
        write_csv(data.path(), "subject", "work_id,subject
1,Portraits
2,Flowers
");
        let db = data.path().join("paint.db");

        let args = cli(&[
            "--database-url",
            &format!("sqlite://{}", db.display()),
            "--data-dir",
            data.path().to_str().unwrap(),
            "--table",
            "subject",
            "--json",
        ]);
        run(&args).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_data_directory_is_rejected() {
        let data = tempfile::tempdir().unwrap();
        let db = data.path().join("never.db");
        let missing = data.path().join("no such dir");

        let args = cli(&[
            "--database-url",
            &format!("sqlite://{}", db.display()),
            "--data-dir",
            missing.to_str().unwrap(),
        ]);
        let err = run(&args).await.unwrap_err();

        assert!(matches!(err, CsvLoadError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_connection_command() {
        let args = cli(&["test", "--database-url", "sqlite::memory:"]);
        run(&args).await.unwrap();
    }

    #[tokio::test]
    async fn test_unrecognized_url_is_rejected() {
        let args = cli(&["test", "--database-url", "mysql://root@localhost/paint"]);
        let err = run(&args).await.unwrap_err();
        assert!(matches!(err, CsvLoadError::Configuration { .. }));
    }
}
