use crate::types::{LibraryId, LibraryRecord, SourceKind, SourceSpec};

struct SeedLibrary {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    docs_url: &'static str,
    repository: &'static str,
    package_manager: &'static str,
    tags: &'static [&'static str],
    popularity: f32,
}

const SEED: &[SeedLibrary] = &[
    SeedLibrary {
        id: "/vercel/next.js",
        name: "Next.js",
        description: "The React Framework for Production",
        docs_url: "https://nextjs.org/docs",
        repository: "https://github.com/vercel/next.js",
        package_manager: "npm",
        tags: &["react", "framework", "ssr", "static-site"],
        popularity: 0.95,
    },
    SeedLibrary {
        id: "/supabase/supabase",
        name: "Supabase",
        description: "The Open Source Firebase Alternative",
        docs_url: "https://supabase.com/docs",
        repository: "https://github.com/supabase/supabase",
        package_manager: "npm",
        tags: &["database", "auth", "backend", "postgresql"],
        popularity: 0.90,
    },
    SeedLibrary {
        id: "/facebook/react",
        name: "React",
        description: "A JavaScript library for building user interfaces",
        docs_url: "https://react.dev",
        repository: "https://github.com/facebook/react",
        package_manager: "npm",
        tags: &["ui", "library", "javascript", "frontend"],
        popularity: 0.98,
    },
    SeedLibrary {
        id: "/tailwindlabs/tailwindcss",
        name: "Tailwind CSS",
        description: "A utility-first CSS framework",
        docs_url: "https://tailwindcss.com/docs",
        repository: "https://github.com/tailwindlabs/tailwindcss",
        package_manager: "npm",
        tags: &["css", "framework", "utility", "styling"],
        popularity: 0.92,
    },
    SeedLibrary {
        id: "/fastapi/fastapi",
        name: "FastAPI",
        description: "FastAPI framework, high performance, easy to learn",
        docs_url: "https://fastapi.tiangolo.com",
        repository: "https://github.com/tiangolo/fastapi",
        package_manager: "pypi",
        tags: &["python", "api", "framework", "async"],
        popularity: 0.94,
    },
    SeedLibrary {
        id: "/microsoft/typescript",
        name: "TypeScript",
        description: "TypeScript is a superset of JavaScript",
        docs_url: "https://www.typescriptlang.org/docs",
        repository: "https://github.com/microsoft/TypeScript",
        package_manager: "npm",
        tags: &["typescript", "javascript", "language", "types"],
        popularity: 0.96,
    },
];

/// Libraries available before any remote refresh.
pub fn builtin_libraries() -> Vec<LibraryRecord> {
    SEED.iter()
        .filter_map(|seed| {
            let id = LibraryId::parse(seed.id).ok()?;
            Some(
                LibraryRecord::new(id, seed.name)
                    .with_description(seed.description)
                    .with_source(SourceSpec::new(seed.docs_url, SourceKind::OfficialDocs, 1))
                    .with_source(SourceSpec::new(seed.repository, SourceKind::Github, 2))
                    .with_repository(seed.repository, seed.package_manager)
                    .with_tags(seed.tags.iter().copied())
                    .with_popularity(seed.popularity),
            )
        })
        .collect()
}
