use std::collections::BTreeMap;
use std::io::Write;
use std::{
    env,
    fs::{self, OpenOptions},
};

use anyhow::Context;
use coursekit::catalog::{apply_progress, normalize_course, parse_tracking, Course};
use coursekit::client::ApiClient;
use serde::Serialize;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";
const DEFAULT_OUTPUT_DIR: &str = "output/courses";
const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

pub struct Config {
    pub course_id: String,
    pub output_dir: String,
    pub base_url: String,
}

fn parse_config(mut args: impl Iterator<Item = String>) -> anyhow::Result<Config> {
    let course_id = args
        .next()
        .context("course_id is required, use the numeric id from /courses/")?;
    let output_dir = args.next().unwrap_or(DEFAULT_OUTPUT_DIR.to_string());
    let base_url = env::var("COURSE_API_URL").unwrap_or(DEFAULT_BASE_URL.to_string());

    Ok(Config {
        course_id,
        output_dir,
        base_url,
    })
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = match parse_config(env::args().skip(1)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Usage: cargo run --bin fetch_course <course_id> [output_dir]");
            return Err(e);
        }
    };

    let client = ApiClient::new(&config.base_url);
    let bundle = client
        .fetch_course_bundle(&config.course_id)
        .with_context(|| format!("could not load course with id {}", config.course_id))?;

    let mut course = normalize_course(
        &bundle.course,
        &bundle.modules,
        &bundle.reviews,
        bundle.is_enrolled,
        bundle.rating.as_ref(),
    );
    if let Some(tracking) = bundle.tracking.as_ref() {
        let records = parse_tracking(tracking);
        apply_progress(&mut course.modules, &records);
    }

    create_output_dir(&config.output_dir).context("failed to create output directory")?;

    let slug = course_slug(&course);
    let metadata = create_course_metadata(&course, &slug, &config.output_dir)
        .context("failed to create course metadata")?;
    create_course_tree(&course, &slug, &config.output_dir)
        .context("failed to write course tree")?;

    println!("Fetched course metadata\n");
    println!("---");
    println!("{}", metadata);
    println!("---\n");

    println!(
        "created {BOLD}{}{RESET} modules ({BOLD}{}{RESET} lessons) in {BOLD}{}/{}.json{RESET}",
        course.modules.len(),
        course.total_lessons,
        &config.output_dir,
        slug
    );

    Ok(())
}

fn course_slug(course: &Course) -> String {
    let mut slugger = github_slugger::Slugger::default();
    let slug = slugger.slug(&course.title);
    if slug.is_empty() {
        format!("course-{}", course.id)
    } else {
        slug
    }
}

fn create_course_metadata(course: &Course, slug: &str, output_dir: &str) -> anyhow::Result<String> {
    let mut file = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(format!("{}/course.yaml", output_dir))
        .context("failed to open file for course.yaml")?;

    let mut map = BTreeMap::<&str, CourseFrontmatter>::new();
    map.insert("title", CourseFrontmatter::Title(course.title.as_str()));
    map.insert("slug", CourseFrontmatter::Slug(slug));
    map.insert(
        "subtitle",
        CourseFrontmatter::Subtitle(course.subtitle.as_str()),
    );
    map.insert("rating", CourseFrontmatter::Rating(course.rating));
    map.insert("price", CourseFrontmatter::Price(course.pricing.price));
    map.insert("modules", CourseFrontmatter::Modules(course.modules.len()));
    map.insert("lessons", CourseFrontmatter::Lessons(course.total_lessons));
    map.insert("enrolled", CourseFrontmatter::Enrolled(course.is_enrolled));

    let content = serde_yaml_ng::to_string(&map).context("failed to serialize course metadata")?;
    write!(file, "{}", content).context("failed to write course metadata")?;

    Ok(content)
}

fn create_course_tree(course: &Course, slug: &str, output_dir: &str) -> anyhow::Result<()> {
    let mut file = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(format!("{}/{}.json", output_dir, slug))
        .context(format!("failed to open file for {}", slug))?;

    let content =
        serde_json::to_string_pretty(course).context("failed to serialize course tree")?;
    write!(file, "{}", content).context("failed to write course tree")?;

    Ok(())
}

fn create_output_dir(output_dir: &str) -> anyhow::Result<()> {
    if fs::metadata(output_dir).is_ok() {
        fs::remove_dir_all(output_dir)?;
    }

    fs::create_dir_all(output_dir)?;
    Ok(())
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
enum CourseFrontmatter<'a> {
    Title(&'a str),
    Slug(&'a str),
    Subtitle(&'a str),
    Rating(f64),
    Price(f64),
    Modules(usize),
    Lessons(u64),
    Enrolled(bool),
}
