//! Handler registration for every skill command.

use skillctl_commands::skill::{self, RunOptions, ScaffoldOptions};

use crate::cli::Commands;
use crate::command_registry::CommandRegistry;
use crate::{EXIT_FAILURE, EXIT_OK};

pub fn register_all(reg: &mut CommandRegistry) {
    reg.register(|cmd, layout| {
        if let Commands::List { json } = cmd {
            let mut out = std::io::stdout().lock();
            Some(skill::cmd_list(layout, *json, &mut out).map(|_| EXIT_OK))
        } else {
            None
        }
    });

    reg.register(|cmd, layout| {
        if let Commands::Describe {
            target,
            json,
            allow_template,
        } = cmd
        {
            let mut out = std::io::stdout().lock();
            Some(
                skill::cmd_describe(layout, target, *json, *allow_template, &mut out)
                    .map(|_| EXIT_OK),
            )
        } else {
            None
        }
    });

    reg.register(|cmd, layout| {
        if let Commands::Validate {
            targets,
            all,
            allow_template,
        } = cmd
        {
            Some(skill::cmd_validate(layout, targets, *all, *allow_template).map(|_| EXIT_OK))
        } else {
            None
        }
    });

    reg.register(|cmd, layout| {
        if let Commands::Run {
            target,
            input,
            output,
            timeout_ms,
            allow_template,
        } = cmd
        {
            let opts = RunOptions {
                target: target.clone(),
                input: input.clone(),
                output: output.clone(),
                timeout_ms: *timeout_ms,
                allow_template: *allow_template,
            };
            Some(skill::cmd_run(layout, &opts).map(|ok| if ok { EXIT_OK } else { EXIT_FAILURE }))
        } else {
            None
        }
    });

    reg.register(|cmd, layout| {
        if let Commands::Scaffold {
            skill_id,
            slug,
            name,
            description,
            version,
            spec_id,
        } = cmd
        {
            let opts = ScaffoldOptions {
                skill_id: skill_id.clone(),
                slug: slug.clone(),
                name: name.clone(),
                description: description.clone(),
                version: version.clone(),
                spec_id: spec_id.clone(),
            };
            Some(skill::cmd_scaffold(layout, &opts).map(|_| EXIT_OK))
        } else {
            None
        }
    });
}
