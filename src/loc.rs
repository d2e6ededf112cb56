use crate::runner::CommandRunner;
use crate::types::LocRow;

/// Counts lines of code per file with an external `cloc`-compatible
/// program (`cloc --csv --by-file <path>`).
///
/// The trailing version column cloc appends to its header and any
/// malformed row are ignored with a warning; a missing or failing cloc
/// binary is a hard error since there is nothing to report without it.
pub fn get_cloc(
    runner: &dyn CommandRunner,
    cloc_program: &str,
    path: &str,
) -> Result<Vec<LocRow>, String> {
    let argv = vec![
        cloc_program.to_string(),
        "--csv".to_string(),
        "--by-file".to_string(),
        path.to_string(),
    ];
    let output = runner.run(&argv).map_err(|e| e.to_string())?;
    parse_cloc_csv(&output)
}

fn parse_cloc_csv(output: &str) -> Result<Vec<LocRow>, String> {
    // cloc prints a summary line before the CSV table; skip to the header.
    let table = match output.find("language,") {
        Some(pos) => &output[pos..],
        None => return Err(format!("no CSV table in cloc output: {}", output.trim())),
    };
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(table.as_bytes());
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| format!("cannot parse cloc output: {e}"))?;
        if record.len() < 5 || record.get(0) == Some("SUM") {
            continue;
        }
        let parsed = (
            record[2].trim().parse::<u64>(),
            record[3].trim().parse::<u64>(),
            record[4].trim().parse::<u64>(),
        );
        let (Ok(blank), Ok(comment), Ok(code)) = parsed else {
            log::warn!("ignoring malformed cloc row: {record:?}");
            continue;
        };
        rows.push(LocRow {
            language: record[0].to_string(),
            path: record[1].trim_start_matches("./").to_string(),
            blank,
            comment,
            code,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLOC_OUTPUT: &str = "\
      62 text files.
      62 unique files.
      23 files ignored.

language,filename,blank,comment,code,\"github.com/AlDanial/cloc v 1.81\"
Python,./internals.py,55,50,130
Python,./tests/test_core.py,29,92,291
C/C++ Header,./builtin.h,2,0,8
";

    #[test]
    fn test_parses_by_file_rows() {
        let rows = parse_cloc_csv(CLOC_OUTPUT).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].language, "Python");
        assert_eq!(rows[0].path, "internals.py", "leading ./ is stripped");
        assert_eq!(rows[0].blank, 55);
        assert_eq!(rows[0].comment, 50);
        assert_eq!(rows[0].code, 130);
        assert_eq!(rows[2].language, "C/C++ Header");
    }

    #[test]
    fn test_preamble_and_version_column_ignored() {
        let rows = parse_cloc_csv(CLOC_OUTPUT).unwrap();
        assert!(
            rows.iter().all(|r| !r.path.contains("files")),
            "the summary preamble is not data"
        );
    }

    #[test]
    fn test_sum_row_skipped() {
        let output = "language,filename,blank,comment,code\nPython,a.py,1,2,3\nSUM,,1,2,3\n";
        let rows = parse_cloc_csv(output).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].path, "a.py");
    }

    #[test]
    fn test_malformed_row_skipped() {
        let output = "language,filename,blank,comment,code\nPython,a.py,x,y,z\nPython,b.py,1,2,3\n";
        let rows = parse_cloc_csv(output).unwrap();
        assert_eq!(rows.len(), 1, "unparseable counts drop the row, not the table");
        assert_eq!(rows[0].path, "b.py");
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let err = parse_cloc_csv("cloc: command output garbage").unwrap_err();
        assert!(err.contains("no CSV table"), "unexpected error: {err}");
    }
}
