use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use nexgddp_query::bbox::LocationParams;
use nexgddp_query::config::DatasetConfig;
use nexgddp_query::memory::{MemoryBackend, RecordingCatalog};
use nexgddp_query::service::{ApiResponse, QueryRequest, QueryService};

const HELP: &str = r#"命令:
  \use <scenario/model>          切换当前数据集
  \geostore <id>                 使用 geostore 作为查询区域
  \point <lat> <lon>             使用坐标点作为查询区域
  \nolocation                    清除查询区域
  \fields                        列出当前数据集的字段
  \register <connector> <table>  校验并登记数据集
  \help                          显示帮助
  \quit                          退出
其他输入按 SQL 执行, 例如:
  SELECT avg(tasmax) FROM historical WHERE year BETWEEN 2000 AND 2003"#;

/// 交互式会话状态
struct Session {
    service: QueryService<MemoryBackend>,
    catalog: RecordingCatalog,
    table_name: String,
    location: LocationParams,
}

impl Session {
    fn new(config: DatasetConfig) -> Self {
        let mut tables: Vec<_> = config.datasets.keys().cloned().collect();
        tables.sort();
        let table_name = tables.into_iter().next().unwrap_or_default();
        Self {
            service: QueryService::new(MemoryBackend::new(config)),
            catalog: RecordingCatalog::default(),
            table_name,
            location: LocationParams::default(),
        }
    }

    /// 处理一行输入，返回 false 表示退出
    fn handle(&mut self, line: &str) -> Result<bool> {
        let mut words = line.split_whitespace();
        match words.next() {
            Some("\\quit") | Some("\\q") => return Ok(false),
            Some("\\help") => println!("{}", HELP),
            Some("\\use") => {
                self.table_name = words.next().context("用法: \\use <scenario/model>")?.to_string();
                println!("当前数据集: {}", self.table_name);
            }
            Some("\\geostore") => {
                let id = words.next().context("用法: \\geostore <id>")?;
                self.location = LocationParams { geostore: Some(id.to_string()), ..Default::default() };
            }
            Some("\\point") => {
                let lat = words.next().context("缺少 lat")?.parse::<f64>().context("lat 不是数字")?;
                let lon = words.next().context("缺少 lon")?.parse::<f64>().context("lon 不是数字")?;
                self.location = LocationParams { lat: Some(lat), lon: Some(lon), ..Default::default() };
            }
            Some("\\nolocation") => self.location = LocationParams::default(),
            Some("\\fields") => print_response(&self.service.fields(&self.table_name))?,
            Some("\\register") => {
                let connector = words.next().context("用法: \\register <connector> <table>")?;
                let table = words.next().context("用法: \\register <connector> <table>")?;
                print_response(&self.service.register_dataset(&self.catalog, connector, table))?;
            }
            Some(command) if command.starts_with('\\') => println!("未知命令: {}", command),
            Some(_) => {
                let request = QueryRequest {
                    table_name: self.table_name.clone(),
                    sql: Some(line.to_string()),
                    location: self.location.clone(),
                };
                print_response(&self.service.query(&request))?;
            }
            None => {}
        }
        Ok(true)
    }
}

fn print_response(response: &ApiResponse) -> Result<()> {
    println!("[{}]", response.status);
    println!("{}", serde_json::to_string_pretty(&response.body)?);
    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let _ = env_logger::Builder::from_default_env()
        .filter_module("nexgddp_query", log::LevelFilter::Info)
        .try_init();

    println!("--- NEX-GDDP 查询终端 ---");
    let mut session = Session::new(DatasetConfig::load_or_default());
    println!("当前数据集: {} (输入 \\help 查看命令)", session.table_name);

    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("nexgddp> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line)?;
                match session.handle(line) {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => println!("✗ {:#}", e),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
