//! Cleanup applied to every completion before it reaches a user.

fn pass(text: &str) -> String {
    let mut out = text.trim().replace("```", "");
    out = out.replace("<p>", "").replace("</p>", "");
    out = out.replace("<br/>", "\n").replace("<br>", "\n");
    while out.contains("\n\n\n") {
        out = out.replace("\n\n\n", "\n\n");
    }
    out
}

/// Strips code fences and stray HTML paragraph markup and squeezes blank
/// lines. Repeats until nothing changes, so `sanitize(sanitize(x)) ==
/// sanitize(x)`.
pub fn sanitize(raw: &str) -> String {
    let mut current = pass(raw);
    loop {
        let next = pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}
