//! Template engine setup and HTML templates.

use once_cell::sync::Lazy;
use tera::{Context, Tera};

use crate::error::Result;

/// Global template engine instance with embedded templates.
pub static TEMPLATES: Lazy<Tera> = Lazy::new(|| {
    let mut tera = Tera::default();

    // Embed templates directly in the binary (no external files needed)
    tera.add_raw_templates(vec![
        ("base.html", BASE_TEMPLATE),
        ("assets_index.html", ASSETS_INDEX_TEMPLATE),
        ("asset_form.html", ASSET_FORM_TEMPLATE),
        ("asset_new.html", ASSET_NEW_TEMPLATE),
        ("asset_edit.html", ASSET_EDIT_TEMPLATE),
        ("assets_search.html", ASSETS_SEARCH_TEMPLATE),
        ("error.html", ERROR_TEMPLATE),
    ])
    .expect("Failed to load templates");

    tera
});

/// Render a template with context
pub fn render(template: &str, context: &Context) -> Result<String> {
    Ok(TEMPLATES.render(template, context)?)
}

// =============================================================================
// Embedded Templates
// =============================================================================

const BASE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{% block title %}Media{% endblock %}</title>
    <style>
        :root {
            --bg: #0a0a0a;
            --bg-secondary: #141414;
            --foreground: #fafafa;
            --foreground-secondary: rgba(250, 250, 250, 0.7);
            --foreground-tertiary: rgba(250, 250, 250, 0.4);
            --border: #262626;
            --border-subtle: #1a1a1a;
            --danger: #f87171;
            --success: #4ade80;
        }

        * { box-sizing: border-box; margin: 0; padding: 0; }

        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Helvetica, Arial, sans-serif;
            background: var(--bg);
            color: var(--foreground);
            line-height: 1.6;
        }

        a { color: var(--foreground); text-decoration: none; }
        a:hover { opacity: 0.7; }

        .header { border-bottom: 1px solid var(--border-subtle); padding: 20px 32px; }
        .header-content {
            max-width: 1200px;
            margin: 0 auto;
            display: flex;
            align-items: center;
            justify-content: space-between;
        }
        .logo { font-size: 18px; font-weight: 600; }
        .nav { display: flex; gap: 32px; }
        .nav a { color: var(--foreground-secondary); font-size: 14px; }

        .container { max-width: 1200px; margin: 0 auto; padding: 48px 32px; }
        .layout { display: grid; grid-template-columns: 240px 1fr; gap: 32px; }

        h1 { font-size: 32px; font-weight: 600; margin-bottom: 32px; }
        h2 {
            font-size: 13px;
            font-weight: 500;
            color: var(--foreground-secondary);
            text-transform: uppercase;
            margin-bottom: 12px;
        }

        .card {
            background: var(--bg-secondary);
            border: 1px solid var(--border);
            border-radius: 16px;
            overflow: hidden;
        }

        .flash { padding: 12px 20px; border-radius: 12px; margin-bottom: 24px; font-size: 14px; }
        .flash-notice { background: rgba(34, 197, 94, 0.15); color: var(--success); }
        .flash-error { background: rgba(248, 113, 113, 0.15); color: var(--danger); }

        table { width: 100%; border-collapse: collapse; font-size: 14px; }
        th, td { padding: 12px 16px; border-bottom: 1px solid var(--border-subtle); text-align: left; }
        th { color: var(--foreground-tertiary); font-weight: 500; }
        tr:last-child td { border-bottom: none; }

        .badge {
            font-size: 11px;
            padding: 3px 10px;
            border-radius: 100px;
            background: var(--border);
            color: var(--foreground-secondary);
            text-transform: uppercase;
        }
        .badge-private { background: rgba(234, 179, 8, 0.15); color: #facc15; }

        .btn {
            display: inline-flex;
            align-items: center;
            padding: 8px 18px;
            border-radius: 100px;
            font-size: 14px;
            border: none;
            cursor: pointer;
        }
        .btn-primary { background: var(--foreground); color: var(--bg); }
        .btn-secondary { background: transparent; border: 1px solid var(--border); color: var(--foreground); }
        .btn-danger { background: transparent; border: 1px solid var(--danger); color: var(--danger); }

        .filter { margin-bottom: 24px; }
        .filter a { display: block; font-size: 14px; color: var(--foreground-secondary); padding: 2px 0; }
        .filter a.active { color: var(--foreground); font-weight: 600; }

        form.stacked label { display: block; font-size: 13px; color: var(--foreground-secondary); margin: 16px 0 6px; }
        input[type=text], input[type=date], textarea {
            width: 100%;
            padding: 8px 12px;
            background: var(--bg);
            border: 1px solid var(--border);
            border-radius: 8px;
            color: var(--foreground);
        }
        .errors { color: var(--danger); font-size: 14px; margin-bottom: 16px; list-style: none; }

        .pagination { display: flex; gap: 12px; align-items: center; padding: 16px; font-size: 14px; }
        .empty { text-align: center; padding: 64px 32px; color: var(--foreground-tertiary); }
        .text-tertiary { color: var(--foreground-tertiary); }
        .text-sm { font-size: 13px; }
        .mt-4 { margin-top: 16px; }
    </style>
</head>
<body>
    <header class="header">
        <div class="header-content">
            <a href="/assets" class="logo">Media</a>
            <nav class="nav">
                <a href="/assets">Assets</a>
                <a href="/assets/new">Upload</a>
            </nav>
        </div>
    </header>
    <main class="container">
        {% if notice %}<div class="flash flash-notice">{{ notice }}</div>{% endif %}
        {% if error %}<div class="flash flash-error">{{ error }}</div>{% endif %}
        {% block content %}{% endblock %}
    </main>
</body>
</html>"##;

const ASSETS_INDEX_TEMPLATE: &str = r##"{% extends "base.html" %}
{% block title %}Assets - Media{% endblock %}
{% block content %}
{% set q_text = params.filter_text | urlencode_strict %}
{% set q_tag = params.filter_tag | urlencode_strict %}
{% set q_type = params.filter_type | urlencode_strict %}
{% set q_visibility = params.filter_visibility | urlencode_strict %}
{% set q_start = params.filter_created_start | urlencode_strict %}
{% set q_end = params.filter_created_end | urlencode_strict %}
{% set q_filters = "filter_text=" ~ q_text ~ "&filter_tag=" ~ q_tag ~ "&filter_created_start=" ~ q_start ~ "&filter_created_end=" ~ q_end %}
{% set q_order = "order_by=" ~ ordering.field ~ "&sort_order=" ~ ordering.order %}
<div class="flex" style="display: flex; justify-content: space-between; align-items: center;">
    <h1>Assets</h1>
    <a href="/assets/new" class="btn btn-primary">Upload asset</a>
</div>

<div class="layout">
    <aside>
        {% for filter in filters %}
        <div class="filter">
            <h2>{{ filter.caption }}</h2>
            {% if filter.kind == "text" %}
            <form method="get" action="/assets">
                <input type="text" name="filter_text" value="{{ params.filter_text }}">
                <input type="hidden" name="filter_type" value="{{ params.filter_type }}">
                <input type="hidden" name="filter_visibility" value="{{ params.filter_visibility }}">
                <input type="hidden" name="filter_tag" value="{{ params.filter_tag }}">
            </form>
            {% elif filter.kind == "link" %}
            {% set others = q_filters ~ "&" ~ q_order %}
            {% if filter.param == "filter_type" %}{% set others = others ~ "&filter_visibility=" ~ q_visibility %}{% set current = params.filter_type %}
            {% else %}{% set others = others ~ "&filter_type=" ~ q_type %}{% set current = params.filter_visibility %}{% endif %}
            {% if filter.all_caption %}
            <a href="/assets?{{ others }}" {% if not current %}class="active"{% endif %}>{{ filter.all_caption }}</a>
            {% endif %}
            {% for option in filter.options %}
            <a href="/assets?{{ others }}&{{ filter.param }}={{ option.key | urlencode_strict }}" {% if current == option.key %}class="active"{% endif %}>{{ option.name }}</a>
            {% endfor %}
            {% elif filter.kind == "date" %}
            <form method="get" action="/assets">
                <input type="date" name="{{ filter.start_param }}" value="{{ params.filter_created_start }}">
                <input type="date" name="{{ filter.end_param }}" value="{{ params.filter_created_end }}" class="mt-4">
                <input type="hidden" name="filter_text" value="{{ params.filter_text }}">
                <input type="hidden" name="filter_type" value="{{ params.filter_type }}">
                <input type="hidden" name="filter_visibility" value="{{ params.filter_visibility }}">
                <button type="submit" class="btn btn-secondary mt-4">Filter</button>
            </form>
            {% endif %}
        </div>
        {% endfor %}

        {% if tags %}
        <div class="filter">
            <h2>Tags</h2>
            {% for tag in tags %}
            <a href="/assets?filter_tag={{ tag.name | urlencode_strict }}" {% if params.filter_tag == tag.name %}class="active"{% endif %}>{{ tag.name }}</a>
            {% endfor %}
        </div>
        {% endif %}
    </aside>

    <section class="card">
        {% if assets %}
        <table>
            <thead>
                <tr>
                    {% for field in order_fields %}
                    <th><a href="/assets?{{ q_filters }}&filter_type={{ q_type }}&filter_visibility={{ q_visibility }}&order_by={{ field.key }}&sort_order={% if ordering.field == field.key and ordering.order == "asc" %}desc{% else %}asc{% endif %}">{{ field.name }}</a></th>
                    {% endfor %}
                    <th>Type</th>
                    <th>Visibility</th>
                    <th>Size</th>
                    <th>Tags</th>
                    <th></th>
                </tr>
            </thead>
            <tbody>
                {% for asset in assets %}
                <tr>
                    <td>{{ asset.id }}</td>
                    <td><a href="/assets/{{ asset.id }}/edit">{{ asset.name }}</a>{% if asset.description %}<div class="text-sm text-tertiary">{{ asset.description }}</div>{% endif %}</td>
                    <td class="text-tertiary">{{ asset.created }}</td>
                    <td class="text-tertiary">{{ asset.updated }}</td>
                    <td>{{ asset.type_caption }}</td>
                    <td><span class="badge {% if asset.visibility == "private" %}badge-private{% endif %}">{{ asset.visibility_caption }}</span></td>
                    <td class="text-tertiary">{{ asset.size }}</td>
                    <td class="text-sm">{{ asset.tags | join(sep=", ") }}</td>
                    <td>
                        <a href="{{ asset.url }}" class="text-sm">View</a>
                        <form method="post" action="/assets/{{ asset.id }}/delete" style="display: inline;">
                            <button type="submit" class="btn btn-danger">Delete</button>
                        </form>
                    </td>
                </tr>
                {% endfor %}
            </tbody>
        </table>
        <div class="pagination">
            {% set q_all = q_filters ~ "&filter_type=" ~ q_type ~ "&filter_visibility=" ~ q_visibility ~ "&" ~ q_order %}
            {% if page.prev_page %}<a href="/assets?{{ q_all }}&page={{ page.prev_page }}">&larr; Previous</a>{% endif %}
            <span class="text-tertiary">Page {{ page.page }} of {{ page.total_pages }} ({{ page.total_items }} assets)</span>
            {% if page.next_page %}<a href="/assets?{{ q_all }}&page={{ page.next_page }}">Next &rarr;</a>{% endif %}
        </div>
        {% else %}
        <div class="empty">
            <p>No assets found</p>
        </div>
        {% endif %}
    </section>
</div>
{% endblock %}"##;

const ASSET_FORM_TEMPLATE: &str = r##"<form method="post" action="{{ form.action }}" enctype="multipart/form-data" class="stacked">
    {% if errors %}
    <ul class="errors">
        {% for message in errors %}<li>{{ message }}</li>{% endfor %}
    </ul>
    {% endif %}
    {% if form.field %}<input type="hidden" name="field" value="{{ form.field }}">{% endif %}
    <label for="asset_name">Name</label>
    <input type="text" id="asset_name" name="asset[name]" value="{{ form.name }}">

    <label for="asset_description">Description</label>
    <textarea id="asset_description" name="asset[description]" rows="3">{{ form.description }}</textarea>

    <label for="asset_tag_list">Tags (comma separated)</label>
    <input type="text" id="asset_tag_list" name="asset[tag_list]" value="{{ form.tag_list }}">

    <label for="asset_resource">File</label>
    <input type="file" id="asset_resource" name="asset[resource]">

    {% if form.show_visibility %}
    <label><input type="checkbox" name="asset[is_protected]" value="1" {% if form.is_protected %}checked{% endif %}> Private</label>
    {% endif %}

    <div class="mt-4">
        <button type="submit" class="btn btn-primary">{{ form.submit }}</button>
        <a href="/assets" class="btn btn-secondary">Back</a>
    </div>
</form>"##;

const ASSET_NEW_TEMPLATE: &str = r##"{% extends "base.html" %}
{% block title %}New asset - Media{% endblock %}
{% block content %}
<h1>New asset</h1>
<div class="card" style="padding: 24px; max-width: 640px;">
    {% include "asset_form.html" %}
</div>
{% endblock %}"##;

const ASSET_EDIT_TEMPLATE: &str = r##"{% extends "base.html" %}
{% block title %}{{ asset.name }} - Media{% endblock %}
{% block content %}
<h1>Edit asset</h1>
<div class="card" style="padding: 24px; max-width: 640px;">
    <p class="text-sm text-tertiary">
        {{ asset.file_name }} &middot; {{ asset.size }} &middot; {{ asset.visibility_caption }}
        &middot; <a href="{{ asset.url }}">View file</a>
    </p>
    {% include "asset_form.html" %}
</div>
{% endblock %}"##;

const ASSETS_SEARCH_TEMPLATE: &str = r##"<div class="asset-picker" data-field="{{ field }}">
    {% if assets %}
    <ul>
        {% for asset in assets %}
        <li data-asset-id="{{ asset.id }}" data-asset-name="{{ asset.name }}" data-url="{{ asset.url }}">
            {{ asset.name }} <span class="text-tertiary text-sm">{{ asset.type_caption }}</span>
        </li>
        {% endfor %}
    </ul>
    <div class="pagination">
        {% if page.prev_page %}<a href="/assets/search?field={{ field | urlencode_strict }}&text={{ text | urlencode_strict }}&asset_type_id={{ asset_type_id | urlencode_strict }}&visibility={{ visibility | urlencode_strict }}&page={{ page.prev_page }}">&larr;</a>{% endif %}
        <span class="text-tertiary">{{ page.page }} / {{ page.total_pages }}</span>
        {% if page.next_page %}<a href="/assets/search?field={{ field | urlencode_strict }}&text={{ text | urlencode_strict }}&asset_type_id={{ asset_type_id | urlencode_strict }}&visibility={{ visibility | urlencode_strict }}&page={{ page.next_page }}">&rarr;</a>{% endif %}
    </div>
    {% else %}
    <p class="empty">No assets found</p>
    {% endif %}
</div>"##;

const ERROR_TEMPLATE: &str = r##"{% extends "base.html" %}
{% block title %}Error - Media{% endblock %}
{% block content %}
<div class="card">
    <div style="padding: 48px; text-align: center;">
        <h1 style="margin-bottom: 16px;">Something went wrong</h1>
        <p>{{ message }}</p>
        <a href="/assets" class="btn btn-secondary mt-4">Back to assets</a>
    </div>
</div>
{% endblock %}"##;
