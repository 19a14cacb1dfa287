// ==========================================
// 下载管道集成测试
// ==========================================
// 测试目标: 上传 → 下载端到端闭环,模板生成
// ==========================================


use querycsv::{
    logging, CsvExporter, EngineConfig, RecordImporter, RecordImporterImpl, SchemaClassifier,
    TemplateFields,
};
use std::collections::HashMap;
use test_helpers::{create_test_store, member_schema, temp_csv};

/// 读回 CSV 为 (表头, 行列表)
fn read_csv(path: &std::path::Path) -> (Vec<String>, Vec<HashMap<String, String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers: Vec<String> = reader
        .headers()
        .unwrap()
        .iter()
        .map(|h| h.to_string())
        .collect();

    let rows = reader
        .records()
        .map(|record| {
            let record = record.unwrap();
            headers
                .iter()
                .cloned()
                .zip(record.iter().map(|v| v.to_string()))
                .collect()
        })
        .collect();

    (headers, rows)
}

#[tokio::test]
async fn test_upload_then_download_round_trip() {
    logging::init_test();

    let schema = member_schema();
    let (_db, store) = create_test_store();
    let importer = RecordImporterImpl::new(&schema, store.clone());

    // 带下标的标量列表列 + 点分嵌套对象列
    let csv = temp_csv(&[
        "name,tags[0],tags[1],address.city,address.state",
        "Ada,alpha,beta,Austin,TX",
        "Grace,gamma,delta,Dallas,TX",
    ]);

    let outcome = importer.upload_from_file(csv.path(), &[]).await.unwrap();
    assert_eq!(outcome.success_count(), 2);

    // 标量列表按位置归位,嵌套对象成形
    assert_eq!(
        outcome.successes[0].get("tags"),
        Some(&serde_json::json!(["alpha", "beta"]))
    );
    assert_eq!(
        outcome.successes[0].get("address"),
        Some(&serde_json::json!({"city": "Austin", "state": "TX"}))
    );

    // 下载重现列与值
    let temp_dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::new(temp_dir.path());
    let classifier = SchemaClassifier::new(&schema);
    let exporter = CsvExporter::new(&classifier, &config);

    let download_path = exporter.download_csv(&store).await.unwrap();
    let (headers, rows) = read_csv(&download_path);

    assert!(headers.contains(&"name".to_string()));
    assert!(headers.contains(&"tags".to_string()));
    assert!(headers.contains(&"address.city".to_string()));
    assert!(headers.contains(&"address.state".to_string()));

    assert_eq!(rows.len(), 2);
    let ada = rows
        .iter()
        .find(|row| row.get("name").map(String::as_str) == Some("Ada"))
        .unwrap();
    assert_eq!(ada.get("tags").map(String::as_str), Some("alpha, beta"));
    assert_eq!(ada.get("address.city").map(String::as_str), Some("Austin"));
    assert_eq!(ada.get("address.state").map(String::as_str), Some("TX"));
}

#[tokio::test]
async fn test_download_aligns_rows_with_different_shapes() {
    logging::init_test();

    let schema = member_schema();
    let (_db, store) = create_test_store();
    let importer = RecordImporterImpl::new(&schema, store.clone());

    // 第一行无列表,第二行两个列表元素 → 下载表头取并集
    let csv = temp_csv(&[
        "name,email,links[0].label,links[1].label",
        "Ada,s1@example.com,,",
        "Grace,s2@example.com,home,work",
    ]);
    importer.upload_from_file(csv.path(), &[]).await.unwrap();

    let temp_dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::new(temp_dir.path());
    let classifier = SchemaClassifier::new(&schema);
    let exporter = CsvExporter::new(&classifier, &config);

    let download_path = exporter.download_csv(&store).await.unwrap();
    let (headers, rows) = read_csv(&download_path);

    assert!(headers.contains(&"links[0].label".to_string()));
    assert!(headers.contains(&"links[1].label".to_string()));
    assert_eq!(rows.len(), 2);

    let ada = rows
        .iter()
        .find(|row| row.get("name").map(String::as_str) == Some("Ada"))
        .unwrap();
    // 没有该列表元素的行对齐为空单元格
    assert_eq!(ada.get("links[0].label").map(String::as_str), Some(""));
}

#[tokio::test]
async fn test_csv_template_field_sets() {
    let schema = member_schema();
    let temp_dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::new(temp_dir.path());
    let classifier = SchemaClassifier::new(&schema);
    let exporter = CsvExporter::new(&classifier, &config);

    let all_path = exporter.csv_template(TemplateFields::All).unwrap();
    let (all_headers, _) = read_csv(&all_path);
    assert!(all_headers.contains(&"id".to_string()));
    assert!(all_headers.contains(&"links[n].label".to_string()));

    let required_path = exporter.csv_template(TemplateFields::Required).unwrap();
    let (required_headers, _) = read_csv(&required_path);
    assert_eq!(required_headers, vec!["name"]);

    let writable_path = exporter.csv_template(TemplateFields::Writable).unwrap();
    let (writable_headers, _) = read_csv(&writable_path);
    assert!(!writable_headers.contains(&"id".to_string()));
    assert!(writable_headers.contains(&"tags".to_string()));
}
