use crate::types::DocumentFile;

pub const BLANK_DOCUMENT_NAME: &str = "main.igtex";

pub const BLANK_DOCUMENT_TEMPLATE: &str = r"%title: My presentation's title
%subtitle: My presentation's subtitle
%author: Arnaud Lelièvre
        
\section{My blank presentation}
\subsection{my blank presentation with ImGoaTeX}

\begin{frame}{ImGoaTeX is great !}[align=center]<ZoomIn>
    This is a blank presentation.
    \pause
    $\int_{0}^{+\infty} e^{-x^2} dx = \sqrt{\pi}$
    \textbox{Happy coding with ImGoaTeX !}[position=right, rotate=90, fontsize=1.5, border, size=2]
\end{frame}
";

pub fn blank_document() -> DocumentFile {
    DocumentFile::new(BLANK_DOCUMENT_NAME, BLANK_DOCUMENT_TEMPLATE.as_bytes().to_vec())
}
